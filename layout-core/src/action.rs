//! The closed set of structural edits the reducer understands.

use serde::{Deserialize, Serialize};

use crate::{NodeKind, NodeRef, PropertyBag, Rect, WidgetId, WidgetType};

/// Insert index sentinel: place the moved nodes front-most among their siblings.
pub const FRONT_MOST: i32 = -1;

/// New bounds for one widget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundsUpdate {
    /// Target widget.
    pub id: WidgetId,
    /// Replacement rectangle.
    pub bounds: Rect,
}

/// A structural edit.
///
/// Every variant is applied atomically by [`crate::Reducer::reduce`]: either
/// the whole edit lands in a new validated snapshot or nothing changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Action {
    /// Append a new widget front-most.
    CreateWidget {
        /// Widget type.
        widget_type: WidgetType,
        /// Initial bounds.
        bounds: Rect,
        /// Initial properties.
        properties: PropertyBag,
    },
    /// Remove widgets and detach them from groups, layers and bindings.
    DeleteWidgets {
        /// Widgets to remove.
        ids: Vec<WidgetId>,
    },
    /// Replace the bounds of several widgets as one edit.
    SetWidgetsBounds {
        /// Per-widget rectangles.
        items: Vec<BoundsUpdate>,
    },
    /// Merge a property patch onto widgets, groups or layers.
    SetProps {
        /// Node kind of every id.
        kind: NodeKind,
        /// Target nodes.
        ids: Vec<WidgetId>,
        /// Keys to overwrite.
        patch: PropertyBag,
    },
    /// Wrap top-level widgets and groups in a new top-level group.
    GroupWidgets {
        /// Top-level widgets to own directly.
        widget_ids: Vec<WidgetId>,
        /// Top-level groups to adopt as children.
        group_ids: Vec<WidgetId>,
        /// Name of the new group.
        name: String,
    },
    /// Dissolve groups, promoting their children.
    UngroupWidgets {
        /// Groups to remove.
        group_ids: Vec<WidgetId>,
    },
    /// Move same-kind nodes under a new parent.
    Reparent {
        /// Nodes to move, all widgets or all groups.
        refs: Vec<NodeRef>,
        /// Destination group, or [`WidgetId::ROOT`].
        parent_id: WidgetId,
        /// Position among the destination's remaining children, or [`FRONT_MOST`].
        insert_index: i32,
    },
    /// Re-sequence nodes that already share `parent_id`.
    Reorder {
        /// Nodes to move.
        refs: Vec<NodeRef>,
        /// Their common direct parent.
        parent_id: WidgetId,
        /// Position among the remaining siblings, or [`FRONT_MOST`].
        insert_index: i32,
    },
}

impl Action {
    /// Short name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateWidget { .. } => "CreateWidget",
            Self::DeleteWidgets { .. } => "DeleteWidgets",
            Self::SetWidgetsBounds { .. } => "SetWidgetsBounds",
            Self::SetProps { .. } => "SetProps",
            Self::GroupWidgets { .. } => "GroupWidgets",
            Self::UngroupWidgets { .. } => "UngroupWidgets",
            Self::Reparent { .. } => "Reparent",
            Self::Reorder { .. } => "Reorder",
        }
    }
}
