// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Grid geometry and overlap-preserving resize.

use coffer::testkit::RecordingHost;
use coffer::{ContainerError, Element, PrimValue, PrimitiveKind, ScriptGrid};

fn int_elem(v: i32) -> Element {
    Element::Prim(PrimValue::I32(v))
}

fn int_at(grid: &ScriptGrid, x: usize, y: usize) -> i32 {
    match grid.at(x, y).expect("cell in range") {
        Element::Prim(PrimValue::I32(v)) => *v,
        other => panic!("expected i32 cell, got {:?}", other),
    }
}

fn int_grid(w: usize, h: usize) -> ScriptGrid {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I32);
    ScriptGrid::new(host.services(), ty, w, h).unwrap()
}

#[test]
fn cells_default_to_zero() {
    let grid = int_grid(2, 2);
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(int_at(&grid, x, y), 0);
        }
    }
}

#[test]
fn grow_preserves_originals_and_defaults_new_cells() {
    let mut grid = int_grid(2, 2);
    // All four cells hold 0 already; stamp them to be sure they travel.
    for y in 0..2 {
        for x in 0..2 {
            grid.set(x, y, &int_elem((x + 10 * y) as i32)).unwrap();
        }
    }
    grid.resize(3, 3).unwrap();
    assert_eq!(grid.width(), 3);
    assert_eq!(grid.height(), 3);
    for y in 0..2 {
        for x in 0..2 {
            assert_eq!(int_at(&grid, x, y), (x + 10 * y) as i32);
        }
    }
    // The five newly exposed cells hold the default.
    for (x, y) in [(2, 0), (2, 1), (0, 2), (1, 2), (2, 2)] {
        assert_eq!(int_at(&grid, x, y), 0);
    }
}

#[test]
fn resize_round_trip_preserves_triple_overlap() {
    let mut grid = int_grid(4, 3);
    for y in 0..3 {
        for x in 0..4 {
            grid.set(x, y, &int_elem((x * 100 + y) as i32)).unwrap();
        }
    }
    grid.resize(2, 5).unwrap();
    grid.resize(4, 3).unwrap();
    // Cells inside the overlap of all three rectangles (2x3) survive.
    for y in 0..3 {
        for x in 0..2 {
            assert_eq!(int_at(&grid, x, y), (x * 100 + y) as i32);
        }
    }
    // Cells outside the 2x5 intermediate geometry were re-defaulted.
    assert_eq!(int_at(&grid, 3, 2), 0);
}

#[test]
fn width_change_moves_rows_not_flat_ranges() {
    let mut grid = int_grid(3, 2);
    // Row-major payloads: row 0 = 1,2,3; row 1 = 4,5,6.
    let mut v = 1;
    for y in 0..2 {
        for x in 0..3 {
            grid.set(x, y, &int_elem(v)).unwrap();
            v += 1;
        }
    }
    grid.resize(2, 2).unwrap();
    assert_eq!(int_at(&grid, 0, 0), 1);
    assert_eq!(int_at(&grid, 1, 0), 2);
    assert_eq!(int_at(&grid, 0, 1), 4);
    assert_eq!(int_at(&grid, 1, 1), 5);
}

#[test]
fn out_of_range_cell_is_an_error() {
    let mut grid = int_grid(2, 2);
    assert!(matches!(
        grid.at(2, 0),
        Err(ContainerError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        grid.at(0, 2),
        Err(ContainerError::IndexOutOfBounds { .. })
    ));
    assert!(matches!(
        grid.set(5, 5, &int_elem(1)),
        Err(ContainerError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn shrink_releases_dropped_handles() {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    let mut grid = ScriptGrid::new(host.services(), ty.clone(), 2, 2).unwrap();

    let kept = host.handle_element(&ty, 1);
    let dropped = host.handle_element(&ty, 2);
    let kept_id = match &kept {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };
    let dropped_id = match &dropped {
        Element::Handle(Some(h)) => h.id(),
        _ => unreachable!(),
    };
    grid.set(0, 0, &kept).unwrap();
    grid.set(1, 1, &dropped).unwrap();
    assert_eq!(host.refs_of(kept_id), 2);
    assert_eq!(host.refs_of(dropped_id), 2);

    grid.resize(1, 1).unwrap();
    assert_eq!(host.refs_of(kept_id), 2);
    assert_eq!(host.refs_of(dropped_id), 1);
}

#[test]
fn with_value_fills_every_cell() {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I32);
    let grid = ScriptGrid::with_value(host.services(), ty, 3, 2, &int_elem(7)).unwrap();
    for y in 0..2 {
        for x in 0..3 {
            assert_eq!(int_at(&grid, x, y), 7);
        }
    }
}

#[test]
fn by_value_grid_resize_keeps_payloads() {
    let host = RecordingHost::new();
    let ty = host.register_value_type("vec3", false);
    let mut grid = ScriptGrid::new(host.services(), ty.clone(), 2, 2).unwrap();
    let marker = host.value_element(&ty, 77);
    grid.set(1, 1, &marker).unwrap();

    grid.resize(3, 3).unwrap();
    match grid.at(1, 1).unwrap() {
        Element::Value(v) => assert_eq!(host.payload_of(v.id()), Some(77)),
        _ => unreachable!(),
    }
    // 9 grid cells plus the standalone marker.
    assert_eq!(host.live_instances(), 10);
}
