//! Randomised edit sequences: atomicity, id uniqueness and undo/redo symmetry.

use std::collections::HashSet;

use layout_core::validate::validate_scene;
use layout_core::{
    BuiltinSchema, DocumentHandle, LayerMove, PropertyBag, Rect, SchemaVersion, WidgetId,
    WidgetType,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Add(usize),
    Remove(usize),
    Nudge(usize, i16),
    Group(usize, usize),
    Ungroup(usize),
    Layer(usize, usize),
    Undo,
    Redo,
}

const MOVES: [LayerMove; 4] = [
    LayerMove::BringForward,
    LayerMove::SendBackward,
    LayerMove::BringToFront,
    LayerMove::SendToBack,
];

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        3 => (0..WidgetType::ALL.len()).prop_map(Edit::Add),
        1 => any::<usize>().prop_map(Edit::Remove),
        2 => (any::<usize>(), -20i16..20).prop_map(|(pick, dx)| Edit::Nudge(pick, dx)),
        2 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Edit::Group(a, b)),
        1 => any::<usize>().prop_map(Edit::Ungroup),
        2 => (any::<usize>(), 0..MOVES.len()).prop_map(|(pick, m)| Edit::Layer(pick, m)),
        1 => Just(Edit::Undo),
        1 => Just(Edit::Redo),
    ]
}

fn pick(ids: &[WidgetId], index: usize) -> Option<WidgetId> {
    if ids.is_empty() {
        None
    } else {
        Some(ids[index % ids.len()])
    }
}

/// Apply one edit. Returns `Some(created ids)` when the handle changed and
/// history grew, `None` when the edit was rejected or touched only history.
fn apply(handle: &mut DocumentHandle, edit: &Edit) -> Option<Vec<WidgetId>> {
    let doc = handle.document();
    let widgets: Vec<WidgetId> = doc.widgets.iter().map(|w| w.id).collect();
    let groups: Vec<WidgetId> = doc.groups.iter().map(|g| g.id).collect();
    let result = match edit {
        Edit::Add(t) => handle
            .add_widget(WidgetType::ALL[*t], Rect::default(), PropertyBag::new())
            .map(|id| vec![id]),
        Edit::Remove(i) => {
            let id = pick(&widgets, *i)?;
            handle.remove_widgets(&[id]).map(|()| Vec::new())
        }
        Edit::Nudge(i, dx) => {
            let id = pick(&widgets, *i)?;
            handle
                .move_widgets(&[id], f32::from(*dx), 1.0)
                .map(|()| Vec::new())
        }
        Edit::Group(a, b) => {
            let (a, b) = (pick(&widgets, *a)?, pick(&widgets, *b)?);
            handle.select(&[a, b]).ok()?;
            handle.group_selection("").map(|id| vec![id])
        }
        Edit::Ungroup(i) => {
            let id = pick(&groups, *i)?;
            handle
                .dispatch(&layout_core::Action::UngroupWidgets { group_ids: vec![id] })
                .map(|_| Vec::new())
        }
        Edit::Layer(i, m) => {
            let id = pick(&widgets, *i)?;
            handle.select(&[id]).ok()?;
            handle.move_selection(MOVES[*m]).map(|()| Vec::new())
        }
        Edit::Undo => {
            handle.undo();
            return None;
        }
        Edit::Redo => {
            handle.redo();
            return None;
        }
    };
    result.ok()
}

proptest! {
    #[test]
    fn prop_failed_edits_leave_snapshot_untouched(
        edits in prop::collection::vec(arb_edit(), 1..40)
    ) {
        let mut handle = DocumentHandle::default();
        for edit in &edits {
            if matches!(edit, Edit::Undo | Edit::Redo | Edit::Group(..) | Edit::Layer(..)) {
                // These also change selection before the structural edit.
                apply(&mut handle, edit);
                continue;
            }
            let before = handle.snapshot();
            let depth = handle.undo_depth();
            if apply(&mut handle, edit).is_none() {
                prop_assert_eq!(&handle.snapshot(), &before);
                prop_assert_eq!(handle.undo_depth(), depth);
            }
            let snapshot = handle.snapshot();
            prop_assert!(validate_scene(
                &snapshot.document,
                Some(&snapshot.editor),
                &BuiltinSchema,
                SchemaVersion::CURRENT,
            )
            .is_ok());
        }
    }

    #[test]
    fn prop_ids_are_never_reissued(
        edits in prop::collection::vec(arb_edit(), 1..60)
    ) {
        let mut handle = DocumentHandle::default();
        let mut issued = HashSet::new();
        for edit in &edits {
            if let Some(created) = apply(&mut handle, edit) {
                for id in created {
                    prop_assert!(issued.insert(id), "id {} issued twice", id);
                }
            }
            let doc = handle.document();
            let live: Vec<WidgetId> = doc
                .widgets
                .iter()
                .map(|w| w.id)
                .chain(doc.groups.iter().map(|g| g.id))
                .collect();
            let unique: HashSet<WidgetId> = live.iter().copied().collect();
            prop_assert_eq!(unique.len(), live.len());
        }
    }

    #[test]
    fn prop_undo_redo_symmetry(
        edits in prop::collection::vec(arb_edit(), 1..40)
    ) {
        let mut handle = DocumentHandle::default();
        let initial = handle.snapshot();
        for edit in edits.iter().filter(|e| !matches!(e, Edit::Undo | Edit::Redo)) {
            apply(&mut handle, edit);
        }
        let last = handle.snapshot();
        let depth = handle.undo_depth();

        for _ in 0..depth {
            prop_assert!(handle.undo());
        }
        prop_assert!(!handle.undo());
        prop_assert_eq!(&handle.snapshot(), &initial);

        for _ in 0..depth {
            prop_assert!(handle.redo());
        }
        prop_assert!(!handle.redo());
        prop_assert_eq!(&handle.snapshot(), &last);
        prop_assert_eq!(handle.undo_depth(), depth);
    }
}
