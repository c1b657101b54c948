//! Performance benchmarks for path mutation and dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mutable_sync::{apply_mutation, Dispatcher, Mutation, Path, StateValue, StoreRegistry, SyncMessage};
use serde_json::json;
use std::sync::Arc;

fn board(task_count: usize) -> StateValue {
    let tasks: Vec<_> = (0..task_count)
        .map(|i| json!({"id": i, "title": format!("Task {}", i), "list": "To Do"}))
        .collect();
    let comments: Vec<_> = (0..task_count)
        .map(|i| json!({"id": i, "body": "...", "task_id": i}))
        .collect();
    StateValue::from(json!({"lists": ["To Do", "Done"], "tasks": tasks, "comments": comments}))
}

/// Append cost should track the touched sequence, not the whole board.
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");

    for task_count in [10, 100, 1000, 10_000] {
        let state = board(task_count);
        let mutation = Mutation::Append {
            path: Path::parse("tasks"),
            value: StateValue::from(json!({"id": -1, "title": "new"})),
        };

        group.bench_with_input(BenchmarkId::new("tasks", task_count), &state, |b, state| {
            b.iter(|| black_box(apply_mutation(state, &mutation).unwrap()));
        });
    }

    group.finish();
}

fn bench_nested_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("nested_update");

    for task_count in [10, 1000, 10_000] {
        let state = board(task_count);
        let mutation = Mutation::Update {
            path: Path::parse(&format!("tasks.{}.list", task_count / 2)),
            value: StateValue::from("Done"),
        };

        group.bench_with_input(BenchmarkId::new("tasks", task_count), &state, |b, state| {
            b.iter(|| black_box(apply_mutation(state, &mutation).unwrap()));
        });
    }

    group.finish();
}

fn bench_delete_by_id(c: &mut Criterion) {
    let mut group = c.benchmark_group("delete_by_id");

    for task_count in [10, 1000, 10_000] {
        let state = board(task_count);
        let mutation = Mutation::Delete {
            path: Path::parse(&format!("tasks.{}", task_count / 2)),
        };

        group.bench_with_input(BenchmarkId::new("tasks", task_count), &state, |b, state| {
            b.iter(|| black_box(apply_mutation(state, &mutation).unwrap()));
        });
    }

    group.finish();
}

/// Decode plus apply, as done for every response carrying a sync header.
fn bench_dispatch_raw(c: &mut Criterion) {
    let registry = Arc::new(StoreRegistry::default());
    registry.register("Kanban", board(1000)).unwrap();
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    let raw = SyncMessage::update("Kanban", "tasks.500.title", "Renamed")
        .to_header_value()
        .unwrap();

    c.bench_function("dispatch_raw_update", |b| {
        b.iter(|| black_box(dispatcher.dispatch_raw(&raw)));
    });
}

criterion_group!(
    benches,
    bench_append,
    bench_nested_update,
    bench_delete_by_id,
    bench_dispatch_raw
);
criterion_main!(benches);
