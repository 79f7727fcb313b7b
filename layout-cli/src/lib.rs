//! # Saorsa Layout CLI
//!
//! Command line host for layout documents.
//!
//! ## Usage
//!
//! ```bash
//! layout-engine check panel.json
//! layout-engine inspect panel.json
//! layout-engine apply panel.json --script edits.json --out panel.next.json
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `ScriptCommand` - One step of an edit script, mirroring the handle operations
//! - `run_script` - Replays a script through a `DocumentHandle`
//! - `apply_file` - Load, replay and save, as done by `apply`
//! - `render_tree` - Back-to-front printout of the group forest

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use layout_core::{
    tree, Action, DocumentHandle, DocumentModel, DropPlacement, DropTarget, EngineConfig,
    LayerMove, LayoutResult, NodeKind, NodeRef, PropertyBag, Rect, SchemaVersion, TreeDrop,
    WidgetId, WidgetType, DEFAULT_HISTORY_LIMIT,
};
use serde::{Deserialize, Serialize};

/// Command-line arguments for layout-engine.
#[derive(Debug, Clone, Parser)]
#[command(name = "layout-engine")]
#[command(about = "Validate, inspect and edit layout documents")]
#[command(version)]
pub struct CliArgs {
    /// Maximum undo depth kept while applying scripts
    #[arg(long, env = "LAYOUT_HISTORY_LIMIT", default_value_t = DEFAULT_HISTORY_LIMIT)]
    pub history_limit: usize,

    /// Runtime schema version (major.minor.patch)
    #[arg(long, env = "LAYOUT_RUNTIME_VERSION", default_value_t = SchemaVersion::CURRENT)]
    pub runtime_version: SchemaVersion,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load a document and report whether it is valid
    Check {
        /// Document to check
        file: PathBuf,
    },
    /// Print a document's layer tree
    Inspect {
        /// Document to print
        file: PathBuf,
    },
    /// Replay an edit script against a document
    Apply {
        /// Document to edit
        file: PathBuf,
        /// JSON array of script commands
        #[arg(long)]
        script: PathBuf,
        /// Where to write the result (defaults to overwriting `file`)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

impl From<&CliArgs> for EngineConfig {
    fn from(args: &CliArgs) -> Self {
        Self::default()
            .with_history_limit(args.history_limit)
            .with_schema_version(args.runtime_version)
    }
}

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ScriptCommand {
    /// Add a widget and select it.
    #[serde(rename_all = "camelCase")]
    Add {
        /// Widget type.
        widget_type: WidgetType,
        /// Initial bounds.
        #[serde(default)]
        bounds: Rect,
        /// Initial properties.
        #[serde(default)]
        properties: PropertyBag,
    },
    /// Remove widgets.
    Remove {
        /// Widgets to remove.
        ids: Vec<WidgetId>,
    },
    /// Remove the selection.
    RemoveSelected,
    /// Replace one widget's bounds.
    SetBounds {
        /// Target widget.
        id: WidgetId,
        /// New bounds.
        bounds: Rect,
    },
    /// Translate widgets.
    Move {
        /// Widgets to move.
        ids: Vec<WidgetId>,
        /// Horizontal offset.
        dx: f32,
        /// Vertical offset.
        dy: f32,
    },
    /// Merge properties onto nodes.
    SetProps {
        /// Node kind.
        kind: NodeKind,
        /// Target nodes.
        ids: Vec<WidgetId>,
        /// Properties to write.
        patch: PropertyBag,
    },
    /// Replace the selection.
    Select {
        /// Widgets to select.
        ids: Vec<WidgetId>,
    },
    /// Extend the selection.
    AddToSelection {
        /// Widgets to add.
        ids: Vec<WidgetId>,
    },
    /// Deselect everything.
    ClearSelection,
    /// Group the selection.
    GroupSelection {
        /// Group name; empty picks a default.
        #[serde(default)]
        name: String,
    },
    /// Ungroup the selected group.
    UngroupSelection,
    /// Move the selection in z-order.
    #[serde(rename_all = "camelCase")]
    Layer {
        /// Which move.
        layer_move: LayerMove,
    },
    /// Layer tree drag-and-drop.
    TreeDrop {
        /// Dragged nodes.
        refs: Vec<NodeRef>,
        /// Drop target; omitted means the root.
        #[serde(default)]
        target: Option<NodeRef>,
        /// Placement relative to the target.
        placement: DropPlacement,
    },
    /// Apply a raw reducer action.
    Dispatch {
        /// The action.
        action: Action,
    },
    /// Undo one entry.
    Undo,
    /// Redo one entry.
    Redo,
    /// Open a coalesced edit.
    BeginCoalesced {
        /// Window key.
        key: String,
    },
    /// Close a coalesced edit.
    EndCoalesced {
        /// Window key.
        key: String,
        /// Keep the edits as one entry, or roll them back.
        #[serde(default = "default_commit")]
        commit: bool,
    },
}

const fn default_commit() -> bool {
    true
}

/// Outcome counters for a replayed script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    /// Commands that changed state.
    pub applied: usize,
    /// Commands rejected as no-ops.
    pub skipped: usize,
}

/// Parse a JSON edit script.
///
/// # Errors
///
/// Returns the parse error for malformed scripts.
pub fn parse_script(json: &str) -> serde_json::Result<Vec<ScriptCommand>> {
    serde_json::from_str(json)
}

fn run_command(handle: &mut DocumentHandle, command: &ScriptCommand) -> LayoutResult<bool> {
    match command {
        ScriptCommand::Add {
            widget_type,
            bounds,
            properties,
        } => {
            let id = handle.add_widget(*widget_type, *bounds, properties.clone())?;
            tracing::debug!(%id, "script added widget");
        }
        ScriptCommand::Remove { ids } => handle.remove_widgets(ids)?,
        ScriptCommand::RemoveSelected => handle.remove_selected()?,
        ScriptCommand::SetBounds { id, bounds } => handle.set_widget_bounds(*id, *bounds)?,
        ScriptCommand::Move { ids, dx, dy } => handle.move_widgets(ids, *dx, *dy)?,
        ScriptCommand::SetProps { kind, ids, patch } => {
            handle.set_props(*kind, ids, patch.clone())?;
        }
        ScriptCommand::Select { ids } => handle.select(ids)?,
        ScriptCommand::AddToSelection { ids } => handle.add_to_selection(ids)?,
        ScriptCommand::ClearSelection => handle.clear_selection()?,
        ScriptCommand::GroupSelection { name } => {
            let id = handle.group_selection(name)?;
            tracing::debug!(%id, "script created group");
        }
        ScriptCommand::UngroupSelection => handle.ungroup_selection()?,
        ScriptCommand::Layer { layer_move } => handle.move_selection(*layer_move)?,
        ScriptCommand::TreeDrop {
            refs,
            target,
            placement,
        } => {
            let target = target.map_or(DropTarget::Root, |node| DropTarget::Node { node });
            handle.tree_drop(&TreeDrop {
                refs: refs.clone(),
                target,
                placement: *placement,
            })?;
        }
        ScriptCommand::Dispatch { action } => {
            handle.dispatch(action)?;
        }
        ScriptCommand::Undo => return Ok(handle.undo()),
        ScriptCommand::Redo => return Ok(handle.redo()),
        ScriptCommand::BeginCoalesced { key } => handle.begin_coalesced_edit(key)?,
        ScriptCommand::EndCoalesced { key, commit } => {
            return handle.end_coalesced_edit(key, *commit);
        }
    }
    Ok(true)
}

/// Replay `commands` in order.
///
/// No-op rejections and empty undo/redo are counted and skipped; any other
/// failure stops the run. Earlier commands stay applied.
///
/// # Errors
///
/// The first non-no-op failure, tagged with its position.
pub fn run_script(
    handle: &mut DocumentHandle,
    commands: &[ScriptCommand],
) -> anyhow::Result<ScriptReport> {
    let mut report = ScriptReport::default();
    for (step, command) in commands.iter().enumerate() {
        match run_command(handle, command) {
            Ok(true) => report.applied += 1,
            Ok(false) => report.skipped += 1,
            Err(e) if e.is_no_op() => {
                tracing::debug!(step, error = %e, "script step skipped");
                report.skipped += 1;
            }
            Err(e) => {
                return Err(anyhow::Error::new(e).context(format!("script step {step} failed")));
            }
        }
    }
    Ok(report)
}

/// Load `file`, replay the script at `script`, and save to `out` (or back to
/// `file`). Returns the report and the path written.
///
/// Nothing is written unless every step succeeds.
///
/// # Errors
///
/// Load, parse, script and write failures, each with the path involved.
pub fn apply_file(
    handle: &mut DocumentHandle,
    file: &Path,
    script: &Path,
    out: Option<&Path>,
) -> anyhow::Result<(ScriptReport, PathBuf)> {
    handle
        .load_from_path(file)
        .with_context(|| format!("failed to load {}", file.display()))?;
    let text = std::fs::read_to_string(script)
        .with_context(|| format!("failed to read {}", script.display()))?;
    let commands =
        parse_script(&text).with_context(|| format!("invalid script {}", script.display()))?;
    let report = run_script(handle, &commands)?;
    let target = out.unwrap_or(file).to_path_buf();
    handle
        .save_to_path(&target)
        .with_context(|| format!("failed to write {}", target.display()))?;
    Ok((report, target))
}

/// Render the group forest in back-to-front order, one node per line.
#[must_use]
pub fn render_tree(doc: &DocumentModel) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "document v{} ({} widgets, {} groups, {} layers)",
        doc.schema_version,
        doc.widgets.len(),
        doc.groups.len(),
        doc.layers.len()
    );
    render_children(doc, WidgetId::ROOT, 1, &mut out);
    for layer in &doc.layers {
        let _ = writeln!(
            out,
            "layer {} \"{}\" order={} visible={} locked={} widgets={} groups={}",
            layer.id,
            layer.name,
            layer.order,
            layer.visible,
            layer.locked,
            layer.member_widget_ids.len(),
            layer.member_group_ids.len()
        );
    }
    out
}

fn render_children(doc: &DocumentModel, parent: WidgetId, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for node in tree::siblings(doc, parent) {
        match node.kind {
            NodeKind::Widget => {
                if let Some(widget) = doc.widget(node.id) {
                    let b = widget.bounds;
                    let _ = writeln!(
                        out,
                        "{indent}{} {} [{}, {}, {}x{}]",
                        widget.widget_type, widget.id, b.x, b.y, b.w, b.h
                    );
                }
            }
            NodeKind::Group => {
                let name = doc.group(node.id).map_or("", |g| g.name.as_str());
                let _ = writeln!(out, "{indent}group {} \"{name}\"", node.id);
                render_children(doc, node.id, depth + 1, out);
            }
            NodeKind::Layer => {}
        }
    }
}
