//! Persisted JSON form of a document and its editor state.
//!
//! Ids are written as decimal strings. Every collection other than `widgets`
//! may be omitted on read.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    validate, AssetModel, DocumentModel, EditorStateModel, GroupModel, LayerModel, LayoutResult,
    PropertyBinding, PropertySchema, RuntimeBinding, RuntimeParam, SchemaVersion, WidgetModel,
};

/// On-disk document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFile {
    /// Version the file was written with.
    pub version: SchemaVersion,
    /// Widgets, back to front.
    pub widgets: Vec<WidgetModel>,
    /// Group arena.
    #[serde(default)]
    pub groups: Vec<GroupModel>,
    /// Layers.
    #[serde(default)]
    pub layers: Vec<LayerModel>,
    /// Assets.
    #[serde(default)]
    pub assets: Vec<AssetModel>,
    /// Runtime parameters.
    #[serde(default)]
    pub runtime_params: Vec<RuntimeParam>,
    /// Property bindings.
    #[serde(default)]
    pub property_bindings: Vec<PropertyBinding>,
    /// Runtime bindings.
    #[serde(default)]
    pub runtime_bindings: Vec<RuntimeBinding>,
    /// Editor state saved with the document.
    #[serde(default)]
    pub editor: EditorStateModel,
}

impl DocumentFile {
    /// Capture a document and editor state.
    #[must_use]
    pub fn from_parts(doc: &DocumentModel, editor: &EditorStateModel) -> Self {
        Self {
            version: doc.schema_version,
            widgets: doc.widgets.clone(),
            groups: doc.groups.clone(),
            layers: doc.layers.clone(),
            assets: doc.assets.clone(),
            runtime_params: doc.runtime_params.clone(),
            property_bindings: doc.property_bindings.clone(),
            runtime_bindings: doc.runtime_bindings.clone(),
            editor: editor.clone(),
        }
    }

    /// Split back into the in-memory models.
    #[must_use]
    pub fn into_parts(self) -> (DocumentModel, EditorStateModel) {
        let doc = DocumentModel {
            schema_version: self.version,
            widgets: self.widgets,
            groups: self.groups,
            layers: self.layers,
            assets: self.assets,
            runtime_params: self.runtime_params,
            property_bindings: self.property_bindings,
            runtime_bindings: self.runtime_bindings,
        };
        (doc, self.editor)
    }
}

/// Serialize a document and editor state to pretty JSON.
///
/// # Errors
///
/// Returns [`crate::LayoutError::Serialization`] if encoding fails.
pub fn save_document(doc: &DocumentModel, editor: &EditorStateModel) -> LayoutResult<String> {
    let json = serde_json::to_string_pretty(&DocumentFile::from_parts(doc, editor))?;
    Ok(json)
}

/// Parse and fully validate a document against a runtime version.
///
/// Nothing is returned unless the version is compatible and the scene passes
/// validation, so a failed load never reaches the caller's state.
///
/// # Errors
///
/// Parse failures, incompatible versions and invalid scenes.
pub fn load_document(
    json: &str,
    runtime: SchemaVersion,
    schema: &dyn PropertySchema,
) -> LayoutResult<(DocumentModel, EditorStateModel)> {
    let file: DocumentFile = serde_json::from_str(json)?;
    validate::validate_schema_version(file.version, runtime)?;
    let (doc, editor) = file.into_parts();
    validate::validate_scene(&doc, Some(&editor), schema, runtime)?;
    tracing::debug!(
        version = %doc.schema_version,
        widgets = doc.widgets.len(),
        groups = doc.groups.len(),
        "document loaded"
    );
    Ok((doc, editor))
}

/// Write a document to `path`.
///
/// # Errors
///
/// Serialization or I/O failures.
pub fn save_to_path(
    path: impl AsRef<Path>,
    doc: &DocumentModel,
    editor: &EditorStateModel,
) -> LayoutResult<()> {
    let json = save_document(doc, editor)?;
    std::fs::write(path.as_ref(), json)?;
    tracing::debug!(path = %path.as_ref().display(), "document saved");
    Ok(())
}

/// Read and validate a document from `path`.
///
/// # Errors
///
/// I/O failures plus everything [`load_document`] rejects.
pub fn load_from_path(
    path: impl AsRef<Path>,
    runtime: SchemaVersion,
    schema: &dyn PropertySchema,
) -> LayoutResult<(DocumentModel, EditorStateModel)> {
    let json = std::fs::read_to_string(path.as_ref())?;
    load_document(&json, runtime, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuiltinSchema, LayoutError, PropertyBag, PropertyValue, Rect, WidgetId, WidgetType};

    fn sample() -> (DocumentModel, EditorStateModel) {
        let mut doc = DocumentModel::new();
        let mut props = PropertyBag::new();
        props.insert("text".into(), PropertyValue::from("Go"));
        doc.widgets.push(WidgetModel {
            id: WidgetId::new(1),
            widget_type: WidgetType::Button,
            bounds: Rect::new(1.5, 2.0, 30.0, 12.0),
            properties: props,
        });
        doc.widgets.push(WidgetModel {
            id: WidgetId::new(2),
            widget_type: WidgetType::Label,
            bounds: Rect::default(),
            properties: PropertyBag::new(),
        });
        doc.groups.push(GroupModel {
            id: WidgetId::new(3),
            name: "controls".into(),
            parent_group_id: None,
            member_widget_ids: vec![WidgetId::new(1), WidgetId::new(2)],
            sibling_index: None,
        });
        (doc, EditorStateModel::with_selection([WidgetId::new(2)]))
    }

    #[test]
    fn test_round_trip() {
        let (doc, editor) = sample();
        let json = save_document(&doc, &editor).expect("save");
        let (loaded, loaded_editor) =
            load_document(&json, SchemaVersion::CURRENT, &BuiltinSchema).expect("load");
        assert_eq!(loaded, doc);
        assert_eq!(loaded_editor, editor);
    }

    #[test]
    fn test_ids_written_as_strings() {
        let (doc, editor) = sample();
        let value: serde_json::Value =
            serde_json::from_str(&save_document(&doc, &editor).expect("save")).expect("json");
        assert_eq!(value["widgets"][0]["id"], "1");
        assert_eq!(value["editor"]["selection"][0], "2");
        assert_eq!(value["groups"][0]["memberWidgetIds"][1], "2");
    }

    #[test]
    fn test_minimal_file_loads() {
        let json = r#"{
            "version": {"major": 1, "minor": 0, "patch": 0},
            "widgets": [
                {"id": "7", "type": "knob", "bounds": {"x": 0, "y": 0, "w": 40, "h": 40}}
            ]
        }"#;
        let (doc, editor) =
            load_document(json, SchemaVersion::CURRENT, &BuiltinSchema).expect("load");
        assert_eq!(doc.widgets.len(), 1);
        assert!(doc.groups.is_empty());
        assert!(editor.selection.is_empty());
    }

    #[test]
    fn test_rejects_dangling_selection() {
        let json = r#"{
            "version": {"major": 1, "minor": 0, "patch": 0},
            "widgets": [],
            "editor": {"selection": ["5"]}
        }"#;
        let err = load_document(json, SchemaVersion::CURRENT, &BuiltinSchema).expect_err("bad");
        assert!(matches!(err, LayoutError::Validation(_)));
    }

    #[test]
    fn test_rejects_numeric_ids() {
        let json = r#"{
            "version": {"major": 1, "minor": 0, "patch": 0},
            "widgets": [
                {"id": 7, "type": "knob", "bounds": {"x": 0, "y": 0, "w": 40, "h": 40}}
            ]
        }"#;
        let err = load_document(json, SchemaVersion::CURRENT, &BuiltinSchema).expect_err("bad");
        assert!(matches!(err, LayoutError::Serialization(_)));
    }

    #[test]
    fn test_version_gate() {
        let (mut doc, editor) = sample();
        let json = save_document(&doc, &editor).expect("save");
        assert!(load_document(&json, SchemaVersion::new(1, 0, 1), &BuiltinSchema).is_ok());

        doc.schema_version = SchemaVersion::new(1, 1, 0);
        let json = save_document(&doc, &editor).expect("save");
        let err = load_document(&json, SchemaVersion::new(1, 0, 0), &BuiltinSchema)
            .expect_err("newer document");
        assert!(err.to_string().contains("newer than runtime"));

        doc.schema_version = SchemaVersion::new(2, 0, 0);
        let json = save_document(&doc, &editor).expect("save");
        assert!(matches!(
            load_document(&json, SchemaVersion::new(2, 1, 0), &BuiltinSchema),
            Ok(_)
        ));
        assert!(matches!(
            load_document(&json, SchemaVersion::CURRENT, &BuiltinSchema),
            Err(LayoutError::Version(_))
        ));
    }

    #[test]
    fn test_path_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("doc.json");
        let (doc, editor) = sample();
        save_to_path(&path, &doc, &editor).expect("save");
        let (loaded, _) =
            load_from_path(&path, SchemaVersion::CURRENT, &BuiltinSchema).expect("load");
        assert_eq!(loaded, doc);
    }
}
