//! Benchmarks for task registration and instance allocation.
//!
//! Benchmarks cover:
//! - Registering and removing default-option tasks
//! - Registration spread across several option sets
//! - Name lookups against a populated registry

#![allow(missing_docs)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;

use cron_pool::runtime::ThreadSpawner;
use cron_pool::{EngineOption, Location, TaskTimer, TimerBuilder};

const SPEC: &str = "0 0 1 1 *";

fn timer() -> TaskTimer {
    TimerBuilder::new()
        .spawner(Arc::new(ThreadSpawner))
        .build()
        .expect("timer")
}

fn bench_register_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("register_remove");
    for tasks in [10usize, 100, 500] {
        group.throughput(Throughput::Elements(tasks as u64));
        group.bench_with_input(BenchmarkId::from_parameter(tasks), &tasks, |b, &tasks| {
            let timer = timer();
            let names: Vec<String> = (0..tasks).map(|i| format!("task-{i}")).collect();
            b.iter(|| {
                for name in &names {
                    timer.add_task_by_func(name, SPEC, || {}, &[]).expect("add");
                }
                for name in &names {
                    timer.remove(name).expect("remove");
                }
            });
        });
    }
    group.finish();
}

fn bench_mixed_options(c: &mut Criterion) {
    let option_sets: [&[EngineOption]; 4] = [
        &[],
        &[EngineOption::Recover],
        &[EngineOption::SkipIfStillRunning],
        &[EngineOption::Location(Location::Utc), EngineOption::Recover],
    ];
    c.bench_function("register_mixed_options_200", |b| {
        let timer = timer();
        b.iter(|| {
            for i in 0..200 {
                let name = format!("m{i}");
                timer
                    .add_task_by_func(&name, SPEC, || {}, option_sets[i % option_sets.len()])
                    .expect("add");
            }
            for i in 0..200 {
                timer.remove(&format!("m{i}")).expect("remove");
            }
        });
    });
}

fn bench_find_task(c: &mut Criterion) {
    let timer = timer();
    for i in 0..1000 {
        timer
            .add_task_by_func(&format!("f{i}"), SPEC, || {}, &[])
            .expect("add");
    }
    c.bench_function("find_task_1000", |b| {
        b.iter(|| black_box(timer.find_task(black_box("f500"))));
    });
}

criterion_group!(benches, bench_register_remove, bench_mixed_options, bench_find_task);
criterion_main!(benches);
