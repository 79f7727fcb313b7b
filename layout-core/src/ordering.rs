//! Layer ordering: turns user-level moves into Reorder/Reparent actions.
//!
//! Everything here is a pure function of a document snapshot. Nothing is
//! applied; the caller feeds the returned [`Action`] to the store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::action::{Action, FRONT_MOST};
use crate::{tree, DocumentModel, LayoutError, LayoutResult, NodeKind, NodeRef, WidgetId};

/// Z-order moves on the current selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayerMove {
    /// Swap past the next sibling in front.
    BringForward,
    /// Swap past the previous sibling behind.
    SendBackward,
    /// Front-most among siblings.
    BringToFront,
    /// Back-most among siblings.
    SendToBack,
}

/// Where dragged nodes land relative to the drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DropPlacement {
    /// Immediately behind the target.
    Before,
    /// Immediately in front of the target.
    After,
    /// Front-most child of the target group.
    Into,
}

/// Drop target in the layer tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "target")]
pub enum DropTarget {
    /// The document root.
    Root,
    /// A widget or group.
    Node {
        /// The node under the pointer.
        node: NodeRef,
    },
}

/// A drag-and-drop gesture in the layer tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDrop {
    /// Dragged nodes, all of one kind.
    pub refs: Vec<NodeRef>,
    /// Drop target.
    pub target: DropTarget,
    /// Placement relative to the target.
    pub placement: DropPlacement,
}

/// The sibling units a selection moves as, with their shared parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveUnits {
    /// Direct parent of every unit.
    pub parent: WidgetId,
    /// Units in back-to-front order.
    pub units: Vec<NodeRef>,
}

/// The outermost group whose effective members are exactly `selection`.
#[must_use]
pub fn group_matching_selection(doc: &DocumentModel, selection: &[WidgetId]) -> Option<WidgetId> {
    let wanted: HashSet<WidgetId> = selection.iter().copied().collect();
    if wanted.is_empty() {
        return None;
    }
    doc.groups
        .iter()
        .filter(|g| {
            let members = tree::effective_members(doc, g.id);
            members.len() == wanted.len() && members.iter().all(|m| wanted.contains(m))
        })
        .min_by_key(|g| tree::ancestors(doc, g.id).len())
        .map(|g| g.id)
}

/// Resolve a widget selection to the sibling units it moves as.
///
/// # Errors
///
/// Empty selections, unknown widgets, and selections spread across parents.
pub fn resolve_units(doc: &DocumentModel, selection: &[WidgetId]) -> LayoutResult<MoveUnits> {
    if selection.is_empty() {
        return Err(LayoutError::validation("selection is empty"));
    }
    if let Some(missing) = selection.iter().find(|id| doc.widget(**id).is_none()) {
        return Err(LayoutError::validation(format!(
            "selection references unknown widget {missing}"
        )));
    }

    if let Some(group) = group_matching_selection(doc, selection) {
        let node = NodeRef::group(group);
        return Ok(MoveUnits {
            parent: tree::direct_parent(doc, node),
            units: vec![node],
        });
    }

    let mut units: Vec<NodeRef> = selection.iter().map(|id| NodeRef::widget(*id)).collect();
    let parent = tree::direct_parent(doc, units[0]);
    if units.iter().any(|u| tree::direct_parent(doc, *u) != parent) {
        return Err(LayoutError::structure(
            "layer move requires selection to share same direct parent",
        ));
    }
    units.sort_by_key(|u| tree::paint_key(doc, *u));
    units.dedup();
    Ok(MoveUnits { parent, units })
}

/// Plan a z-order move of `selection` among its siblings.
///
/// # Errors
///
/// Propagates [`resolve_units`] failures; `BringForward` on a selection that
/// is already front-most is a no-op rejection.
pub fn plan_layer_move(
    doc: &DocumentModel,
    selection: &[WidgetId],
    layer_move: LayerMove,
) -> LayoutResult<Action> {
    let MoveUnits { parent, units } = resolve_units(doc, selection)?;
    let siblings = tree::siblings(doc, parent);
    let positions: Vec<usize> = siblings
        .iter()
        .enumerate()
        .filter(|(_, node)| units.contains(node))
        .map(|(i, _)| i)
        .collect();
    let (Some(&first), Some(&last)) = (positions.first(), positions.last()) else {
        return Err(LayoutError::structure(format!(
            "selection is not among the children of {parent}"
        )));
    };
    let remaining: Vec<NodeRef> = siblings
        .iter()
        .filter(|node| !units.contains(node))
        .copied()
        .collect();
    let remaining_index = |node: NodeRef| remaining.iter().position(|n| *n == node);

    let insert = match layer_move {
        LayerMove::BringToFront => FRONT_MOST,
        LayerMove::SendToBack => 0,
        LayerMove::BringForward => {
            let next = siblings[last + 1..]
                .iter()
                .find(|node| !units.contains(node))
                .and_then(|node| remaining_index(*node))
                .ok_or_else(|| LayoutError::no_op("selection is already at requested layer edge"))?;
            index(next + 1)?
        }
        // No sibling behind collapses to the very back.
        LayerMove::SendBackward => match siblings[..first]
            .iter()
            .rev()
            .find(|node| !units.contains(node))
            .and_then(|node| remaining_index(*node))
        {
            Some(at) => index(at)?,
            None => 0,
        },
    };

    tracing::trace!(?layer_move, %parent, insert, "planned layer move");
    Ok(Action::Reorder {
        refs: units,
        parent_id: parent,
        insert_index: insert,
    })
}

fn index(at: usize) -> LayoutResult<i32> {
    i32::try_from(at).map_err(|_| LayoutError::validation(format!("sibling index {at} overflows")))
}

/// Translate a tree drop into exactly one Reorder or Reparent.
///
/// # Errors
///
/// Mixed node kinds, drops onto a dragged node, `into` on a widget, and
/// `before`/`after` the root.
pub fn plan_tree_drop(doc: &DocumentModel, drop: &TreeDrop) -> LayoutResult<Action> {
    let Some(first) = drop.refs.first() else {
        return Err(LayoutError::validation("layer tree drop has nothing to move"));
    };
    if drop.refs.iter().any(|r| r.kind != first.kind) {
        return Err(LayoutError::structure(
            "layer tree drop requires homogeneous node kinds",
        ));
    }
    if first.kind == NodeKind::Layer {
        return Err(LayoutError::structure("layers cannot be dragged in the tree"));
    }

    let (parent, insert) = match (drop.target, drop.placement) {
        (DropTarget::Root, DropPlacement::Into) => (WidgetId::ROOT, FRONT_MOST),
        (DropTarget::Root, _) => {
            return Err(LayoutError::validation(
                "only 'into' placement is valid on the root",
            ))
        }
        (DropTarget::Node { node }, placement) => {
            if drop.refs.contains(&node) {
                return Err(LayoutError::structure(format!(
                    "cannot drop {node} relative to itself"
                )));
            }
            if !doc.contains(node) {
                return Err(LayoutError::validation(format!("unknown drop target {node}")));
            }
            match (node.kind, placement) {
                (NodeKind::Group, DropPlacement::Into) => (node.id, FRONT_MOST),
                (_, DropPlacement::Into) => {
                    return Err(LayoutError::structure(
                        "'into' placement requires a group target",
                    ))
                }
                (NodeKind::Layer, _) => {
                    return Err(LayoutError::structure("layers are not drop targets"))
                }
                (_, placement) => {
                    let parent = tree::direct_parent(doc, node);
                    let at = tree::siblings(doc, parent)
                        .into_iter()
                        .filter(|n| !drop.refs.contains(n))
                        .position(|n| n == node)
                        .ok_or_else(|| {
                            LayoutError::structure(format!("{node} is not a sibling under {parent}"))
                        })?;
                    let at = if placement == DropPlacement::After { at + 1 } else { at };
                    (parent, index(at)?)
                }
            }
        }
    };

    let same_parent = drop
        .refs
        .iter()
        .all(|r| doc.contains(*r) && tree::direct_parent(doc, *r) == parent);
    let action = if same_parent {
        Action::Reorder {
            refs: drop.refs.clone(),
            parent_id: parent,
            insert_index: insert,
        }
    } else {
        Action::Reparent {
            refs: drop.refs.clone(),
            parent_id: parent,
            insert_index: insert,
        }
    };
    tracing::trace!(action = action.name(), %parent, insert, "planned tree drop");
    Ok(action)
}
