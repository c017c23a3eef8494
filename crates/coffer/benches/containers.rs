// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 coffer contributors

//! Container hot paths: append, sort, dictionary round trip.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use coffer::testkit::RecordingHost;
use coffer::{CallScope, Element, PrimValue, PrimitiveKind, ScriptArray, ScriptDictionary};

fn bench_array_push(c: &mut Criterion) {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I64);
    let services = host.services();

    c.bench_function("array_push_1k", |b| {
        b.iter(|| {
            let mut arr = ScriptArray::new(services.clone(), ty.clone());
            for i in 0..1_000i64 {
                arr.push(&Element::Prim(PrimValue::I64(i))).unwrap();
            }
            black_box(arr.len())
        });
    });
}

fn bench_primitive_sort(c: &mut Criterion) {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I64);
    let services = host.services();
    let mut values = Vec::with_capacity(256);
    fastrand::seed(7);
    for _ in 0..256 {
        values.push(fastrand::i64(..));
    }

    c.bench_function("insertion_sort_256_ints", |b| {
        b.iter(|| {
            let mut arr = ScriptArray::new(services.clone(), ty.clone());
            for &v in &values {
                arr.push(&Element::Prim(PrimValue::I64(v))).unwrap();
            }
            arr.sort_ascending(CallScope::TopLevel).unwrap();
            black_box(arr.len())
        });
    });
}

fn bench_handle_sort(c: &mut Criterion) {
    let host = RecordingHost::new();
    let ty = host.register_handle_type("node", false);
    host.add_ordering(&ty);
    let services = host.services();

    c.bench_function("insertion_sort_64_handles", |b| {
        b.iter(|| {
            let mut arr = ScriptArray::new(services.clone(), ty.clone());
            for i in (0..64i64).rev() {
                let elem = host.handle_element(&ty, i);
                arr.push(&elem).unwrap();
            }
            arr.sort_ascending(CallScope::TopLevel).unwrap();
            black_box(arr.len())
        });
    });
}

fn bench_dictionary_round_trip(c: &mut Criterion) {
    let host = RecordingHost::new();
    let ty = host.register_primitive(PrimitiveKind::I64);
    let services = host.services();
    let keys: Vec<String> = (0..128).map(|i| format!("key_{i}")).collect();

    c.bench_function("dict_set_get_128", |b| {
        b.iter(|| {
            let mut dict = ScriptDictionary::new(services.clone());
            for (i, key) in keys.iter().enumerate() {
                dict.set(key, &ty, &Element::Prim(PrimValue::I64(i as i64)))
                    .unwrap();
            }
            let mut sum = 0;
            for key in &keys {
                sum += dict.get_int(key).unwrap().unwrap_or(0);
            }
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_array_push,
    bench_primitive_sort,
    bench_handle_sort,
    bench_dictionary_round_trip
);
criterion_main!(benches);
