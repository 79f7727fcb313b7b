//! End-to-end editing scenarios through the document handle.

use layout_core::{
    tree, DocumentHandle, DocumentModel, DropPlacement, DropTarget, EngineConfig, LayerModel,
    LayoutError, NodeRef, PropertyBag, PropertyBinding, PropertyValue, Rect, RuntimeBinding,
    RuntimeParam, SchemaVersion, TreeDrop, WidgetId, WidgetType, FRONT_MOST,
};

fn add(handle: &mut DocumentHandle, count: usize) -> Vec<WidgetId> {
    (0..count)
        .map(|_| {
            handle
                .add_widget(WidgetType::Button, Rect::default(), PropertyBag::new())
                .expect("add widget")
        })
        .collect()
}

fn root_order(handle: &DocumentHandle) -> Vec<NodeRef> {
    tree::siblings(&handle.document(), WidgetId::ROOT)
}

fn paint_order(handle: &DocumentHandle) -> Vec<WidgetId> {
    handle.document().widgets.iter().map(|w| w.id).collect()
}

#[test]
fn test_group_then_layer_moves_at_edges() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 3);
    assert_eq!(ids, vec![WidgetId::new(1), WidgetId::new(2), WidgetId::new(3)]);

    handle.select(&ids[..2]).expect("select A and B");
    let group = handle.group_selection("G").expect("group");
    assert_eq!(
        tree::effective_members(&handle.document(), group),
        vec![ids[0], ids[1]]
    );
    assert!(tree::is_top_level(&handle.document(), NodeRef::widget(ids[2])));
    assert_eq!(
        root_order(&handle),
        vec![NodeRef::group(group), NodeRef::widget(ids[2])]
    );

    handle.select(&[ids[2]]).expect("select C");
    let depth = handle.undo_depth();
    let err = handle.bring_forward().expect_err("C is already front-most");
    assert!(err.to_string().contains("already at requested layer edge"));
    assert_eq!(handle.undo_depth(), depth);

    handle.send_backward().expect("send C backward");
    assert_eq!(
        root_order(&handle),
        vec![NodeRef::widget(ids[2]), NodeRef::group(group)]
    );
    assert_eq!(paint_order(&handle), vec![ids[2], ids[0], ids[1]]);
}

#[test]
fn test_grouping_split_selection_leaves_no_hidden_edge() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 3);
    handle.select(&[ids[0], ids[2]]).expect("select A and C");
    let group = handle.group_selection("ends").expect("group");
    assert_eq!(
        root_order(&handle),
        vec![NodeRef::widget(ids[1]), NodeRef::group(group)]
    );
    assert_eq!(paint_order(&handle), vec![ids[1], ids[0], ids[2]]);

    handle.select(&[ids[1]]).expect("select B");
    handle.bring_forward().expect("B passes the group");
    assert_eq!(
        root_order(&handle),
        vec![NodeRef::group(group), NodeRef::widget(ids[1])]
    );
    assert_eq!(paint_order(&handle), vec![ids[0], ids[2], ids[1]]);
    let err = handle.bring_forward().expect_err("now front-most");
    assert!(err.is_no_op());
}

#[test]
fn test_removing_group_members_keeps_group_in_tree_order() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 4);
    handle.select(&ids[..2]).expect("select");
    let group = handle.group_selection("pair").expect("group");
    handle.remove_widgets(&ids[..2]).expect("remove");
    let node = NodeRef::group(group);
    assert_eq!(root_order(&handle)[0], node);

    handle.reorder(vec![node], WidgetId::ROOT, FRONT_MOST).expect("to front");
    assert_eq!(root_order(&handle)[2], node);
    handle.reorder(vec![node], WidgetId::ROOT, 0).expect("to back");
    assert_eq!(root_order(&handle)[0], node);

    let json = handle.save_json().expect("save");
    let mut loaded = DocumentHandle::default();
    loaded.load_json(&json).expect("load");
    assert_eq!(root_order(&loaded), root_order(&handle));
}

#[test]
fn test_identical_bounds_do_not_grow_history() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 1);
    let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
    handle.set_widget_bounds(ids[0], rect).expect("first set");
    let depth = handle.undo_depth();
    let err = handle.set_widget_bounds(ids[0], rect).expect_err("second set");
    assert!(err.is_no_op());
    assert_eq!(handle.undo_depth(), depth);
}

#[test]
fn test_schema_version_compatibility() {
    let mut old = DocumentHandle::default();
    add(&mut old, 2);
    let json = old.save_json().expect("save 1.0.0");

    let mut newer_runtime =
        DocumentHandle::new(EngineConfig::default().with_schema_version(SchemaVersion::new(1, 0, 1)));
    newer_runtime.load_json(&json).expect("older document loads");
    assert_eq!(newer_runtime.document().widgets.len(), 2);

    let mut future = DocumentHandle::new(
        EngineConfig::default().with_schema_version(SchemaVersion::new(1, 1, 0)),
    );
    add(&mut future, 1);
    let future_json = future.save_json().expect("save 1.1.0");

    let mut current = DocumentHandle::default();
    let err = current.load_json(&future_json).expect_err("newer document");
    assert!(matches!(err, LayoutError::Version(_)));
    assert!(err.to_string().contains("newer than runtime"));
    assert!(current.document().widgets.is_empty());
}

#[test]
fn test_round_trip_preserves_everything() {
    let mut handle = DocumentHandle::default();
    let mut doc = DocumentModel::new();
    let mut source = DocumentHandle::default();
    let ids = add(&mut source, 3);
    source.select(&ids[1..]).expect("select");
    let group = source.group_selection("right").expect("group");
    doc.widgets.clone_from(&source.document().widgets);
    doc.groups.clone_from(&source.document().groups);
    doc.widgets[0]
        .properties
        .insert("text".into(), PropertyValue::from("Bypass"));
    doc.layers.push(LayerModel {
        id: WidgetId::new(20),
        name: "controls".into(),
        order: 2,
        visible: false,
        locked: true,
        member_widget_ids: vec![ids[0]],
        member_group_ids: vec![group],
    });
    doc.runtime_params.push(RuntimeParam {
        key: "gain".into(),
        default_value: 0.75,
    });
    doc.runtime_bindings.push(RuntimeBinding {
        widget_id: ids[1],
        event: "press".into(),
        param: "gain".into(),
    });
    doc.property_bindings.push(PropertyBinding {
        widget_id: ids[2],
        property: "text".into(),
        expression: "gain * 100".into(),
    });
    handle.reset(doc).expect("reset");
    handle.select(&[ids[0], ids[2]]).expect("select");

    let json = handle.save_json().expect("save");
    let mut loaded = DocumentHandle::default();
    loaded.load_json(&json).expect("load");
    assert_eq!(*loaded.document(), *handle.document());
    assert_eq!(loaded.editor(), handle.editor());
    assert!(!loaded.can_undo());
}

#[test]
fn test_load_reseeds_allocator() {
    let mut source = DocumentHandle::default();
    let ids = add(&mut source, 3);
    source.remove_widgets(&ids[..2]).expect("remove");
    let json = source.save_json().expect("save");

    let mut handle = DocumentHandle::default();
    handle.load_json(&json).expect("load");
    let next = add(&mut handle, 1);
    assert_eq!(next, vec![WidgetId::new(4)]);
}

#[test]
fn test_group_cannot_move_under_itself() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 3);
    handle.select(&ids[..2]).expect("select");
    let inner = handle.group_selection("inner").expect("inner");
    handle.select(&ids).expect("select all");
    let outer = handle.group_selection("outer").expect("outer");
    let before = handle.snapshot();

    for parent in [outer, inner] {
        let err = handle
            .reparent(vec![NodeRef::group(outer)], parent, FRONT_MOST)
            .expect_err("cycle");
        assert!(matches!(err, LayoutError::Structure(_)));
        assert_eq!(handle.snapshot(), before);
    }
}

#[test]
fn test_front_then_back_keeps_untouched_order() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 5);
    let untouched = |handle: &DocumentHandle| -> Vec<WidgetId> {
        paint_order(handle)
            .into_iter()
            .filter(|id| *id != ids[1] && *id != ids[3])
            .collect()
    };
    let original = untouched(&handle);

    handle.select(&[ids[1], ids[3]]).expect("select");
    handle.bring_to_front().expect("front");
    assert_eq!(
        paint_order(&handle),
        vec![ids[0], ids[2], ids[4], ids[1], ids[3]]
    );
    handle.send_to_back().expect("back");
    assert_eq!(
        paint_order(&handle),
        vec![ids[1], ids[3], ids[0], ids[2], ids[4]]
    );
    assert_eq!(untouched(&handle), original);
}

#[test]
fn test_selected_group_moves_as_unit() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 4);
    handle.select(&ids[..2]).expect("select");
    let group = handle.group_selection("pair").expect("group");
    handle.bring_forward().expect("group forward");
    assert_eq!(
        root_order(&handle),
        vec![
            NodeRef::widget(ids[2]),
            NodeRef::group(group),
            NodeRef::widget(ids[3])
        ]
    );
    assert_eq!(paint_order(&handle), vec![ids[2], ids[0], ids[1], ids[3]]);
}

#[test]
fn test_tree_drop_reparents_and_reorders() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 3);
    handle.select(&ids[..2]).expect("select");
    let group = handle.group_selection("pair").expect("group");

    handle
        .tree_drop(&TreeDrop {
            refs: vec![NodeRef::widget(ids[2])],
            target: DropTarget::Node {
                node: NodeRef::widget(ids[0]),
            },
            placement: DropPlacement::After,
        })
        .expect("drop into group next to A");
    let doc = handle.document();
    assert_eq!(
        doc.group(group).expect("group").member_widget_ids,
        vec![ids[0], ids[2], ids[1]]
    );
    assert_eq!(paint_order(&handle), vec![ids[0], ids[2], ids[1]]);

    handle
        .tree_drop(&TreeDrop {
            refs: vec![NodeRef::widget(ids[1])],
            target: DropTarget::Root,
            placement: DropPlacement::Into,
        })
        .expect("drop out to root");
    assert!(tree::is_top_level(&handle.document(), NodeRef::widget(ids[1])));
    assert_eq!(
        root_order(&handle),
        vec![NodeRef::group(group), NodeRef::widget(ids[1])]
    );

    assert!(handle.undo());
    assert!(handle.undo());
    assert_eq!(
        handle.document().group(group).expect("group").member_widget_ids,
        vec![ids[0], ids[1]]
    );
}

#[test]
fn test_coalesced_edit_undoes_atomically() {
    let mut handle = DocumentHandle::default();
    let ids = add(&mut handle, 2);
    let before = handle.snapshot();
    let depth = handle.undo_depth();

    handle.begin_coalesced_edit("rename").expect("begin");
    for (i, id) in ids.iter().enumerate() {
        let mut patch = PropertyBag::new();
        patch.insert("text".into(), PropertyValue::from(format!("Button {i}")));
        handle
            .set_props(layout_core::NodeKind::Widget, &[*id], patch)
            .expect("rename");
    }
    assert!(handle.end_coalesced_edit("rename", true).expect("commit"));
    assert_eq!(handle.undo_depth(), depth + 1);

    assert!(handle.undo());
    assert_eq!(handle.snapshot(), before);
    assert!(handle.redo());
    let doc = handle.document();
    assert_eq!(
        doc.widget(ids[1]).expect("widget").properties.get("text"),
        Some(&PropertyValue::from("Button 1"))
    );
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("panel.json");
    let mut handle = DocumentHandle::default();
    add(&mut handle, 2);
    handle.save_to_path(&path).expect("save");

    let mut loaded = DocumentHandle::default();
    loaded.load_from_path(&path).expect("load");
    assert_eq!(*loaded.document(), *handle.document());
    assert_eq!(loaded.selection(), handle.selection());
}
