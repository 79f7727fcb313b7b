//! Scene validation.
//!
//! Pure checks over a document (and optionally an editor state). The reducer
//! runs them on every candidate snapshot, and hosts can call them directly for
//! diagnostics. All checks short-circuit on the first failure.

use std::collections::{HashMap, HashSet};

use crate::{
    tree, DocumentModel, EditorStateModel, LayoutError, LayoutResult, PropertySchema,
    SchemaVersion, WidgetId,
};

/// Accept `version` if it shares `current`'s major and is not newer.
///
/// # Errors
///
/// Returns [`LayoutError::Version`] describing the mismatch.
pub fn validate_schema_version(version: SchemaVersion, current: SchemaVersion) -> LayoutResult<()> {
    if version.major != current.major {
        return Err(LayoutError::Version(format!(
            "document major version {} does not match runtime {}",
            version.major, current.major
        )));
    }
    if (version.minor, version.patch) > (current.minor, current.patch) {
        return Err(LayoutError::Version(format!(
            "document version {version} is newer than runtime {current}"
        )));
    }
    Ok(())
}

/// Check every structural invariant of a document.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_document(
    doc: &DocumentModel,
    schema: &dyn PropertySchema,
    current: SchemaVersion,
) -> LayoutResult<()> {
    validate_schema_version(doc.schema_version, current)?;
    validate_widgets(doc, schema)?;
    validate_groups(doc)?;
    validate_layers(doc)?;
    validate_bindings(doc)
}

/// Check the selection against the document.
///
/// # Errors
///
/// Returns [`LayoutError::Validation`] for a root, repeated or dangling id.
pub fn validate_editor_state(doc: &DocumentModel, editor: &EditorStateModel) -> LayoutResult<()> {
    let known: HashSet<WidgetId> = doc.widgets.iter().map(|w| w.id).collect();
    let mut seen = HashSet::new();
    for &id in &editor.selection {
        if !id.is_valid() {
            return Err(LayoutError::validation(format!("selection contains invalid id {id}")));
        }
        if !seen.insert(id) {
            return Err(LayoutError::validation(format!("selection repeats id {id}")));
        }
        if !known.contains(&id) {
            return Err(LayoutError::validation(format!(
                "selection references missing widget {id}"
            )));
        }
    }
    Ok(())
}

/// Document checks followed by editor checks, if an editor state is given.
///
/// # Errors
///
/// Returns the first violation found.
pub fn validate_scene(
    doc: &DocumentModel,
    editor: Option<&EditorStateModel>,
    schema: &dyn PropertySchema,
    current: SchemaVersion,
) -> LayoutResult<()> {
    validate_document(doc, schema, current)?;
    match editor {
        Some(editor) => validate_editor_state(doc, editor),
        None => Ok(()),
    }
}

fn validate_widgets(doc: &DocumentModel, schema: &dyn PropertySchema) -> LayoutResult<()> {
    for widget in &doc.widgets {
        if !widget.id.is_valid() {
            return Err(LayoutError::validation(format!(
                "widget id {} must be greater than root",
                widget.id
            )));
        }
        if !widget.bounds.is_finite() {
            return Err(LayoutError::validation(format!(
                "widget {} has non-finite bounds",
                widget.id
            )));
        }
        if widget.bounds.w < 0.0 || widget.bounds.h < 0.0 {
            return Err(LayoutError::validation(format!(
                "widget {} has negative size",
                widget.id
            )));
        }
        schema
            .validate_property_bag(widget.widget_type, &widget.properties)
            .map_err(|e| LayoutError::validation(format!("widget {}: {e}", widget.id)))?;
    }

    let mut ids: Vec<WidgetId> = doc.widgets.iter().map(|w| w.id).collect();
    ids.sort_unstable();
    if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
        return Err(LayoutError::validation(format!("duplicate widget id {}", pair[0])));
    }
    Ok(())
}

fn validate_groups(doc: &DocumentModel) -> LayoutResult<()> {
    let widget_ids: HashSet<WidgetId> = doc.widgets.iter().map(|w| w.id).collect();
    let mut group_ids = HashSet::new();
    for group in &doc.groups {
        if !group.id.is_valid() {
            return Err(LayoutError::validation(format!(
                "group id {} must be greater than root",
                group.id
            )));
        }
        if widget_ids.contains(&group.id) || !group_ids.insert(group.id) {
            return Err(LayoutError::validation(format!("duplicate node id {}", group.id)));
        }
    }

    let mut owner: HashMap<WidgetId, WidgetId> = HashMap::new();
    for group in &doc.groups {
        if let Some(parent) = group.parent_group_id {
            if !group_ids.contains(&parent) {
                return Err(LayoutError::structure(format!(
                    "group {} has missing parent {parent}",
                    group.id
                )));
            }
        }
        for &member in &group.member_widget_ids {
            if !widget_ids.contains(&member) {
                return Err(LayoutError::validation(format!(
                    "group {} references missing widget {member}",
                    group.id
                )));
            }
            if let Some(previous) = owner.insert(member, group.id) {
                return Err(LayoutError::structure(format!(
                    "widget {member} is owned by both group {previous} and group {}",
                    group.id
                )));
            }
        }
    }

    for group in &doc.groups {
        let chain = tree::ancestors(doc, group.id);
        let top = chain.last().copied().unwrap_or(group.id);
        let closes_loop = doc.group(top).is_some_and(|top| {
            top.parent_group_id
                .is_some_and(|p| p == group.id || chain.contains(&p))
        });
        if closes_loop {
            return Err(LayoutError::structure(format!(
                "group {} is part of a parent cycle",
                group.id
            )));
        }
    }
    Ok(())
}

fn validate_layers(doc: &DocumentModel) -> LayoutResult<()> {
    let mut layer_ids = HashSet::new();
    for layer in &doc.layers {
        if !layer.id.is_valid() {
            return Err(LayoutError::validation(format!(
                "layer id {} must be greater than root",
                layer.id
            )));
        }
        if doc.widget(layer.id).is_some() || doc.group(layer.id).is_some() || !layer_ids.insert(layer.id) {
            return Err(LayoutError::validation(format!("duplicate node id {}", layer.id)));
        }
        if let Some(missing) = layer.member_widget_ids.iter().find(|id| doc.widget(**id).is_none()) {
            return Err(LayoutError::validation(format!(
                "layer {} references missing widget {missing}",
                layer.id
            )));
        }
        if let Some(missing) = layer.member_group_ids.iter().find(|id| doc.group(**id).is_none()) {
            return Err(LayoutError::validation(format!(
                "layer {} references missing group {missing}",
                layer.id
            )));
        }
    }
    Ok(())
}

fn validate_bindings(doc: &DocumentModel) -> LayoutResult<()> {
    let mut asset_ids = HashSet::new();
    if let Some(asset) = doc.assets.iter().find(|a| !asset_ids.insert(a.id.as_str())) {
        return Err(LayoutError::validation(format!("duplicate asset id '{}'", asset.id)));
    }
    let mut params = HashSet::new();
    if let Some(param) = doc.runtime_params.iter().find(|p| !params.insert(p.key.as_str())) {
        return Err(LayoutError::validation(format!(
            "duplicate runtime param '{}'",
            param.key
        )));
    }
    if let Some(binding) = doc
        .property_bindings
        .iter()
        .find(|b| doc.widget(b.widget_id).is_none())
    {
        return Err(LayoutError::validation(format!(
            "property binding '{}' targets missing widget {}",
            binding.property, binding.widget_id
        )));
    }
    for binding in &doc.runtime_bindings {
        if doc.widget(binding.widget_id).is_none() {
            return Err(LayoutError::validation(format!(
                "runtime binding '{}' targets missing widget {}",
                binding.event, binding.widget_id
            )));
        }
        if !params.contains(binding.param.as_str()) {
            return Err(LayoutError::validation(format!(
                "runtime binding on widget {} references unknown param '{}'",
                binding.widget_id, binding.param
            )));
        }
    }
    Ok(())
}
