// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Reference-count invariant over foreign elements: every add-ref issued for
//! an object stored in a container is matched by a release when it is
//! overwritten, removed, or the container is destroyed.

use coffer::testkit::RecordingHost;
use coffer::{ContainerError, Element, ScriptArray};

#[test]
fn handle_push_and_drop_balance() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let elem = host.handle_element(&ty, 1);
    let id = match &elem {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };
    assert_eq!(host.refs_of(id), 1);

    {
        let mut arr = ScriptArray::new(host.services(), ty);
        arr.push(&elem).unwrap();
        assert_eq!(host.refs_of(id), 2);
        arr.push(&elem).unwrap();
        assert_eq!(host.refs_of(id), 3);
        arr.remove_at(0).unwrap();
        assert_eq!(host.refs_of(id), 2);
    }
    // Array destruction released the remaining stored reference.
    assert_eq!(host.refs_of(id), 1);

    drop(elem);
    assert_eq!(host.refs_of(id), 0);
    assert_eq!(host.live_instances(), 0);
}

#[test]
fn handle_overwrite_releases_old_reference() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let first = host.handle_element(&ty, 1);
    let second = host.handle_element(&ty, 2);
    let first_id = match &first {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };

    let mut arr = ScriptArray::new(host.services(), ty);
    arr.push(&first).unwrap();
    assert_eq!(host.refs_of(first_id), 2);
    arr.set(0, &second).unwrap();
    assert_eq!(host.refs_of(first_id), 1);
}

#[test]
fn handle_self_assignment_keeps_reference_alive() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let elem = host.handle_element(&ty, 1);
    let id = match &elem {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };

    let mut arr = ScriptArray::new(host.services(), ty.clone());
    arr.push(&elem).unwrap();
    drop(elem);
    assert_eq!(host.refs_of(id), 1);

    // Assign the slot to itself: add-ref happens before release, so the
    // count never transiently hits zero.
    let copy = arr.at(0).unwrap().try_clone().unwrap();
    assert_eq!(host.refs_of(id), 2);
    arr.set(0, &copy).unwrap();
    drop(copy);
    assert_eq!(host.refs_of(id), 1);
    assert!(host.payload_of(id).is_some());
}

#[test]
fn by_value_elements_are_copied_and_destroyed() {
    let host = RecordingHost::new();
    let ty = host.register_value_type("vec3", false);
    let src = host.value_element(&ty, 42);

    {
        let mut arr = ScriptArray::new(host.services(), ty.clone());
        arr.push(&src).unwrap();
        arr.push(&src).unwrap();
        // The source plus two independent copies.
        assert_eq!(host.live_instances(), 3);
        arr.remove_at(1).unwrap();
        assert_eq!(host.live_instances(), 2);
    }
    assert_eq!(host.live_instances(), 1);
    drop(src);
    assert_eq!(host.live_instances(), 0);
}

#[test]
fn by_value_assignment_reuses_slot_storage() {
    let host = RecordingHost::new();
    let ty = host.register_value_type("vec3", false);
    let src = host.value_element(&ty, 7);

    let mut arr = ScriptArray::with_len(host.services(), ty, 1).unwrap();
    let slot_id = match arr.at(0).unwrap() {
        Element::Value(v) => v.id(),
        _ => unreachable!(),
    };
    arr.set(0, &src).unwrap();
    // Copy-assign into existing storage, never a reallocation.
    match arr.at(0).unwrap() {
        Element::Value(v) => assert_eq!(v.id(), slot_id),
        _ => unreachable!(),
    }
    assert_eq!(host.payload_of(slot_id), Some(7));
}

#[test]
fn failed_copy_construction_leaves_array_unchanged() {
    let host = RecordingHost::new();
    let ty = host.register_value_type("vec3", false);
    let src = host.value_element(&ty, 5);

    let mut arr = ScriptArray::new(host.services(), ty);
    arr.push(&src).unwrap();
    host.fail_next_copy();
    let err = arr.push(&src).unwrap_err();
    assert!(matches!(err, ContainerError::CopyConstructionFailed { .. }));
    assert_eq!(arr.len(), 1);
}

#[test]
fn with_value_fills_by_handle_slots() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let fill = host.handle_element(&ty, 9);
    let id = match &fill {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };

    let arr = ScriptArray::with_value(host.services(), ty, 4, &fill).unwrap();
    assert_eq!(arr.len(), 4);
    assert_eq!(host.refs_of(id), 5);
    drop(arr);
    assert_eq!(host.refs_of(id), 1);
}
