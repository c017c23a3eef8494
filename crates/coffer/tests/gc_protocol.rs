// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! GC cooperation: ref counting, mark flag, reference enumeration, and the
//! cycle-sweep release-all operation.

use coffer::testkit::RecordingHost;
use coffer::{
    Collectible, Element, InstanceId, PrimitiveKind, ScriptArray, ScriptDictionary, ScriptGrid,
};

fn enumerated(c: &dyn Collectible) -> Vec<InstanceId> {
    let mut seen = Vec::new();
    c.enumerate_references(&mut |id| seen.push(id));
    seen
}

#[test]
fn container_ref_count_protocol() {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I32);
    let arr = ScriptArray::new(host.services(), ty);

    assert_eq!(arr.ref_count(), 1);
    assert_eq!(arr.add_ref(), 2);
    assert_eq!(arr.release(), 1);
}

#[test]
fn mark_flag_clears_on_ref_traffic() {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I32);
    let arr = ScriptArray::new(host.services(), ty);

    arr.set_gc_flag();
    assert!(arr.gc_flag());
    arr.add_ref();
    assert!(!arr.gc_flag());
    arr.set_gc_flag();
    arr.release();
    assert!(!arr.gc_flag());
}

#[test]
fn array_enumerates_live_handles_only() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let mut arr = ScriptArray::new(host.services(), ty.clone());

    let a = host.handle_element(&ty, 1);
    let b = host.handle_element(&ty, 2);
    arr.push(&a).unwrap();
    arr.push(&Element::Handle(None)).unwrap();
    arr.push(&b).unwrap();

    let ids: Vec<u64> = enumerated(&arr).iter().map(|id| id.0).collect();
    assert_eq!(ids.len(), 2);
    // Null slots are not reported.
    match (&a, &b) {
        (Element::Handle(Some(ha)), Element::Handle(Some(hb))) => {
            assert!(ids.contains(&ha.id().0));
            assert!(ids.contains(&hb.id().0));
        }
        _ => unreachable!(),
    }
}

#[test]
fn traceable_by_value_elements_forward_enumeration() {
    let host = RecordingHost::new();
    let node_ty = host.register_handle_type("node", true);
    let holder_ty = host.register_value_type("holder", true);

    let inner = host.alloc_instance(&node_ty, 1);
    let holder = host.value_element(&holder_ty, 0);
    let holder_src_id = match &holder {
        Element::Value(v) => v.id(),
        _ => unreachable!(),
    };
    host.set_links(holder_src_id, vec![inner]);

    let mut arr = ScriptArray::new(host.services(), holder_ty);
    arr.push(&holder).unwrap();
    // The stored copy forwards the same links as its source in this host.
    let copy_id = match arr.at(0).unwrap() {
        Element::Value(v) => v.id(),
        _ => unreachable!(),
    };
    host.set_links(copy_id, vec![inner]);

    assert_eq!(enumerated(&arr), vec![inner]);
}

#[test]
fn grid_release_all_truncates_to_empty() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let mut grid = ScriptGrid::new(host.services(), ty.clone(), 2, 2).unwrap();
    let elem = host.handle_element(&ty, 5);
    let id = match &elem {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };
    grid.set(0, 0, &elem).unwrap();
    drop(elem);
    assert_eq!(host.refs_of(id), 1);

    grid.release_all_references();
    assert_eq!(grid.width(), 0);
    assert_eq!(grid.height(), 0);
    assert_eq!(host.refs_of(id), 0);
    assert!(enumerated(&grid).is_empty());
}

#[test]
fn dictionary_release_all_is_delete_all() {
    let host = RecordingHost::new();
    let node_ty = host.register_handle_type("node", false);
    let mut dict = ScriptDictionary::new(host.services());

    let elem = host.handle_element(&node_ty, 5);
    dict.set("k", &node_ty, &elem).unwrap();
    drop(elem);
    assert_eq!(enumerated(&dict).len(), 1);

    dict.release_all_references();
    assert_eq!(dict.len(), 0);
    assert!(enumerated(&dict).is_empty());
    assert_eq!(host.live_instances(), 0);
}

#[test]
fn cycle_through_two_containers_is_breakable() {
    // Model a cycle: dictionary A holds a handle kept alive only by A, that
    // instance links back to another instance held only by array B. The
    // sweep calls release_all on both; every count drops to zero.
    let host = RecordingHost::new();
    let node_ty = host.register_handle_type("node", true);

    let x = host.handle_element(&node_ty, 1);
    let y = host.handle_element(&node_ty, 2);
    let (x_id, y_id) = match (&x, &y) {
        (Element::Handle(Some(hx)), Element::Handle(Some(hy))) => (hx.id(), hy.id()),
        _ => unreachable!(),
    };
    host.set_links(x_id, vec![y_id]);
    host.set_links(y_id, vec![x_id]);

    let mut dict = ScriptDictionary::new(host.services());
    let mut arr = ScriptArray::new(host.services(), node_ty.clone());
    dict.set("x", &node_ty, &x).unwrap();
    arr.push(&y).unwrap();
    drop((x, y));
    assert_eq!(host.refs_of(x_id), 1);
    assert_eq!(host.refs_of(y_id), 1);

    dict.release_all_references();
    arr.release_all_references();
    assert_eq!(host.refs_of(x_id), 0);
    assert_eq!(host.refs_of(y_id), 0);
    assert_eq!(host.live_instances(), 0);
}

#[test]
fn construction_notifies_the_tracer() {
    let host = RecordingHost::new();
    let node_ty = host.register_handle_type("node", false);
    let int_ty = host.register_primitive(PrimitiveKind::I32);

    let _arr = ScriptArray::new(host.services(), node_ty.clone());
    let _grid = ScriptGrid::new(host.services(), node_ty, 1, 1).unwrap();
    let _dict = ScriptDictionary::new(host.services());
    // Primitive-only containers hold no references and are not reported.
    let _plain = ScriptArray::new(host.services(), int_ty);

    assert_eq!(
        host.stats.collectibles.load(std::sync::atomic::Ordering::SeqCst),
        3
    );
}
