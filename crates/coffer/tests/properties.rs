// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Property tests: arrays against a plain Vec model, sort round trips, grid
//! resize overlap preservation.

use coffer::testkit::RecordingHost;
use coffer::{CallScope, Element, PrimValue, PrimitiveKind, ScriptArray, ScriptGrid};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum ArrayOp {
    Push(i64),
    InsertAt(usize, i64),
    RemoveAt(usize),
    Resize(usize),
    Set(usize, i64),
}

fn array_op() -> impl Strategy<Value = ArrayOp> {
    prop_oneof![
        any::<i64>().prop_map(ArrayOp::Push),
        (0usize..32, any::<i64>()).prop_map(|(i, v)| ArrayOp::InsertAt(i, v)),
        (0usize..32).prop_map(ArrayOp::RemoveAt),
        (0usize..24).prop_map(ArrayOp::Resize),
        (0usize..32, any::<i64>()).prop_map(|(i, v)| ArrayOp::Set(i, v)),
    ]
}

fn contents(arr: &ScriptArray) -> Vec<i64> {
    arr.iter()
        .map(|e| match e {
            Element::Prim(PrimValue::I64(v)) => *v,
            other => panic!("expected i64 element, got {:?}", other),
        })
        .collect()
}

proptest! {
    /// The array behaves exactly like a Vec under any op sequence, and its
    /// length is the net of all applied size deltas.
    #[test]
    fn array_matches_vec_model(ops in prop::collection::vec(array_op(), 0..64)) {
        let host = RecordingHost::new();
        let ty = host.register_primitive(PrimitiveKind::I64);
        let mut arr = ScriptArray::new(host.services(), ty);
        let mut model: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                ArrayOp::Push(v) => {
                    arr.push(&Element::Prim(PrimValue::I64(v))).unwrap();
                    model.push(v);
                }
                ArrayOp::InsertAt(i, v) => {
                    let r = arr.insert_at(i, &Element::Prim(PrimValue::I64(v)));
                    if i <= model.len() {
                        r.unwrap();
                        model.insert(i, v);
                    } else {
                        prop_assert!(r.is_err());
                    }
                }
                ArrayOp::RemoveAt(i) => {
                    let r = arr.remove_at(i);
                    if i < model.len() {
                        r.unwrap();
                        model.remove(i);
                    } else {
                        prop_assert!(r.is_err());
                    }
                }
                ArrayOp::Resize(n) => {
                    arr.resize(n).unwrap();
                    model.resize(n, 0);
                }
                ArrayOp::Set(i, v) => {
                    let r = arr.set(i, &Element::Prim(PrimValue::I64(v)));
                    if i < model.len() {
                        r.unwrap();
                        model[i] = v;
                    } else {
                        prop_assert!(r.is_err());
                    }
                }
            }
            prop_assert_eq!(arr.len(), model.len());
        }
        prop_assert_eq!(contents(&arr), model);
    }

    /// Ascending then descending sorts are permutations of the same
    /// multiset, and each is correctly ordered.
    #[test]
    fn sort_round_trip_preserves_multiset(values in prop::collection::vec(any::<i64>(), 0..48)) {
        let host = RecordingHost::new();
        let ty = host.register_primitive(PrimitiveKind::I64);
        let mut arr = ScriptArray::new(host.services(), ty);
        for &v in &values {
            arr.push(&Element::Prim(PrimValue::I64(v))).unwrap();
        }

        arr.sort_ascending(CallScope::TopLevel).unwrap();
        let asc = contents(&arr);
        prop_assert!(asc.windows(2).all(|w| w[0] <= w[1]));

        arr.sort_descending(CallScope::TopLevel).unwrap();
        let desc = contents(&arr);
        prop_assert!(desc.windows(2).all(|w| w[0] >= w[1]));

        let mut expected = values.clone();
        expected.sort_unstable();
        prop_assert_eq!(asc, expected.clone());
        expected.reverse();
        prop_assert_eq!(desc, expected);
    }

    /// find returns the first equal element, which for a fresh value
    /// inserted at `i` (absent before) is exactly `i`.
    #[test]
    fn find_locates_first_match(
        mut values in prop::collection::vec(0i64..1000, 1..32),
        probe in 1000i64..2000,
    ) {
        let host = RecordingHost::new();
        let ty = host.register_primitive(PrimitiveKind::I64);
        let mut arr = ScriptArray::new(host.services(), ty);
        let at = values.len() / 2;
        values.insert(at, probe);
        for &v in &values {
            arr.push(&Element::Prim(PrimValue::I64(v))).unwrap();
        }
        let found = arr
            .find(&Element::Prim(PrimValue::I64(probe)), 0, CallScope::TopLevel)
            .unwrap();
        prop_assert_eq!(found, Some(at));
    }

    /// Any resize path preserves the cells inside the overlap of every
    /// geometry visited.
    #[test]
    fn grid_resize_preserves_overlap(
        (w0, h0, w1, h1) in (1usize..8, 1usize..8, 1usize..8, 1usize..8),
    ) {
        let host = RecordingHost::new();
        let ty = host.register_primitive(PrimitiveKind::I64);
        let mut grid = ScriptGrid::new(host.services(), ty, w0, h0).unwrap();
        for y in 0..h0 {
            for x in 0..w0 {
                grid.set(x, y, &Element::Prim(PrimValue::I64((x * 1000 + y) as i64))).unwrap();
            }
        }
        grid.resize(w1, h1).unwrap();
        grid.resize(w0, h0).unwrap();

        let ow = w0.min(w1);
        let oh = h0.min(h1);
        for y in 0..h0 {
            for x in 0..w0 {
                let expected = if x < ow && y < oh { (x * 1000 + y) as i64 } else { 0 };
                match grid.at(x, y).unwrap() {
                    Element::Prim(PrimValue::I64(v)) => prop_assert_eq!(*v, expected),
                    other => prop_assert!(false, "unexpected element {:?}", other),
                }
            }
        }
    }
}
