// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Benchmarks for model staging and the full lifecycle round trip.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use lifecycle::{DeviceSession, HarnessConfig, Model, ModelController};
use mldev::SimulatedDevice;
use std::path::PathBuf;
use std::sync::Arc;

fn write_image(len: usize) -> PathBuf {
    let path = std::env::temp_dir().join(format!("lifecycle-bench-{}-{len}.bin", std::process::id()));
    std::fs::write(&path, vec![0xA5u8; len]).expect("write bench image");
    path
}

fn controller() -> (DeviceSession<SimulatedDevice>, ModelController<SimulatedDevice>) {
    let cfg = HarnessConfig {
        staging_budget: "256M".into(),
        models: vec![PathBuf::from("bench.bin")],
        ..Default::default()
    };
    let session = DeviceSession::open(Arc::new(SimulatedDevice::new(0)), &cfg).expect("open session");
    let ctl = session.controller(&cfg).expect("controller");
    (session, ctl)
}

fn bench_load_unload(c: &mut Criterion) {
    let (_session, ctl) = controller();
    let mut group = c.benchmark_group("load_unload");

    for len in [64 * 1024, 1024 * 1024, 16 * 1024 * 1024] {
        let path = write_image(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &path, |b, path| {
            b.iter(|| {
                let mut model = Model::new(path.clone());
                ctl.load(&mut model).expect("load");
                ctl.unload(&mut model).expect("unload");
            })
        });
    }
    group.finish();
}

fn bench_round_trip(c: &mut Criterion) {
    let (_session, ctl) = controller();
    let path = write_image(256 * 1024);

    c.bench_function("round_trip_256k", |b| {
        b.iter(|| {
            let mut model = Model::new(path.clone());
            ctl.load(&mut model).expect("load");
            ctl.start(&mut model).expect("start");
            ctl.stop(&mut model).expect("stop");
            ctl.unload(&mut model).expect("unload");
        })
    });
}

fn bench_start_stop(c: &mut Criterion) {
    let (_session, ctl) = controller();
    let path = write_image(4096);
    let mut model = Model::new(path);
    ctl.load(&mut model).expect("load");

    c.bench_function("start_stop", |b| {
        b.iter(|| {
            ctl.start(&mut model).expect("start");
            ctl.stop(&mut model).expect("stop");
        })
    });
}

criterion_group!(benches, bench_load_unload, bench_round_trip, bench_start_stop);
criterion_main!(benches);
