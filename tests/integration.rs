//! Integration tests for message dispatch into the application stores.

use mutable_sync::mutables::{self, register_app_stores, Kanban, Todo, KANBAN, TODOS};
use mutable_sync::{
    DispatchOutcome, Dispatcher, OperationKind, StateValue, StoreEvent, StoreRegistry,
    SubscriptionConfig, SubscriptionFilter, SyncConfig, SyncMessage, Version,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn setup() -> (Arc<StoreRegistry>, Dispatcher) {
    init_tracing();
    let registry = Arc::new(StoreRegistry::new(SyncConfig::default()));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    (registry, dispatcher)
}

fn todo(id: i64, title: &str, done: bool) -> serde_json::Value {
    json!({"title": title, "done": done, "id": id, "estimated_time": "", "created_at": "2025-08-08 06:36:54"})
}

// --- Realistic Workflow Tests ---

#[test]
fn test_todo_lifecycle() {
    let (registry, dispatcher) = setup();
    let stores = register_app_stores(&registry).unwrap();

    // get_todos
    let fetched = json!([todo(1, "Learn Next.js", false), todo(2, "Build todo app", false)]);
    let header = SyncMessage::state_sender(TODOS, fetched).to_header_value().unwrap();
    assert!(dispatcher.dispatch_raw(&header).is_applied());
    assert_eq!(stores.todos.get().unwrap().len(), 2);

    // add_todo
    let header = format!(
        r#"{{"type":"mutable-append","key":"Todos","path":"","new_data":{}}}"#,
        todo(3, "Deploy", false)
    );
    assert!(dispatcher.dispatch_raw(&header).is_applied());

    // update_todo sends the whole list back
    let updated = json!([
        todo(1, "Learn Next.js", true),
        todo(2, "Build todo app", false),
        todo(3, "Deploy", false)
    ]);
    dispatcher.dispatch(SyncMessage::state_sender(TODOS, updated));

    // delete_todo addresses the entity by id at the root
    dispatcher.dispatch_raw(r#"{"type":"mutable-delete","key":"Todos","path":"2"}"#);

    let todos: Vec<Todo> = stores.todos.get().unwrap();
    let summary: Vec<(i64, bool)> = todos.iter().map(|t| (t.id, t.done)).collect();
    assert_eq!(summary, vec![(1, true), (3, false)]);
    assert_eq!(stores.todos.version(), Version(4));
}

#[test]
fn test_end_to_end_append_then_replace() {
    let (registry, dispatcher) = setup();
    let todos = registry.register("Todos", StateValue::empty_array()).unwrap();

    dispatcher.dispatch_raw(
        r#"{"type":"mutable-append","key":"Todos","path":"","new_data":{"id":1,"title":"x","done":false}}"#,
    );
    assert_eq!(todos.snapshot().to_json(), json!([{"id": 1, "title": "x", "done": false}]));

    // Full replacement works the same whatever the prior shape.
    let replacement = json!([{"id": 1, "title": "x", "done": true}]);
    dispatcher.dispatch(SyncMessage::state_sender("Todos", replacement.clone()));
    assert_eq!(todos.snapshot().to_json(), replacement);

    registry
        .set_state("Todos", |_| Ok(StateValue::from(json!({"odd": "shape"}))))
        .unwrap();
    dispatcher.dispatch(SyncMessage::state_sender("Todos", replacement.clone()));
    assert_eq!(todos.snapshot().to_json(), replacement);
}

#[test]
fn test_kanban_board_workflow() {
    let (registry, dispatcher) = setup();
    let stores = register_app_stores(&registry).unwrap();

    // create_task
    let task = json!({"title": "Task 4", "list": "To Do", "author": "yosef",
        "time": "2025-08-10 09:00:00", "deadline": "2025-08-12 09:00:00", "id": 4});
    dispatcher.dispatch(SyncMessage::append(KANBAN, "tasks", task));

    // move_task by index
    dispatcher.dispatch(SyncMessage::update(KANBAN, "tasks.3.list", "Done"));

    // add_comment
    let comment = json!({"id": 3, "body": "Looks good", "author": "Shmuli", "task_id": 4});
    dispatcher.dispatch(SyncMessage::append(KANBAN, "comments", comment));

    // delete_task 1
    dispatcher.dispatch(SyncMessage::delete(KANBAN, "tasks.1"));

    let board: Kanban = stores.kanban.get().unwrap();
    let done: Vec<i64> = board.tasks_in("Done").map(|t| t.id).collect();
    assert_eq!(done, vec![3, 4]);
    assert!(board.tasks.iter().all(|t| t.id != 1));
    assert_eq!(board.comments_on(4).count(), 1);
    assert_eq!(board.lists, mutables::initial_kanban().lists);
}

#[test]
fn test_append_grows_by_one_in_order() {
    let (registry, dispatcher) = setup();
    let board = registry
        .register("Board", StateValue::from(json!({"tasks": []})))
        .unwrap();

    for i in 0..5 {
        dispatcher.dispatch(SyncMessage::append("Board", "tasks", json!({"n": i})));
        let len = board.snapshot().get("tasks").and_then(|t| t.as_array().map(<[_]>::len));
        assert_eq!(len, Some(i as usize + 1));
    }

    assert_eq!(
        board.snapshot().to_json(),
        json!({"tasks": [{"n": 0}, {"n": 1}, {"n": 2}, {"n": 3}, {"n": 4}]})
    );
}

#[test]
fn test_update_at_root_replaces_entirely() {
    let (registry, dispatcher) = setup();
    let store = registry
        .register("Settings", StateValue::from(json!({"theme": "dark", "font": 12})))
        .unwrap();

    dispatcher.dispatch(SyncMessage::update("Settings", "", json!({"a": 1})));
    assert_eq!(store.snapshot().to_json(), json!({"a": 1}));
}

#[test]
fn test_delete_modes() {
    let (registry, dispatcher) = setup();
    let store = registry
        .register(
            "Board",
            StateValue::from(json!({
                "tasks": [{"id": 1, "title": "a"}, {"id": 2, "title": "b"}],
                "settings": {"theme": "dark"}
            })),
        )
        .unwrap();

    dispatcher.dispatch(SyncMessage::delete("Board", "tasks.1"));
    dispatcher.dispatch(SyncMessage::delete("Board", "settings.theme"));
    assert_eq!(
        store.snapshot().to_json(),
        json!({"tasks": [{"id": 2, "title": "b"}], "settings": {}})
    );

    let before = store.snapshot();
    let outcome = dispatcher.dispatch(SyncMessage::delete("Board", "tasks.99"));
    assert_eq!(outcome, DispatchOutcome::Unchanged { key: "Board".to_string() });
    dispatcher.dispatch(SyncMessage::delete("Board", "missing.theme"));
    assert!(store.snapshot().same_ref(&before));

    dispatcher.dispatch(SyncMessage::delete("Board", ""));
    assert_eq!(store.snapshot().to_json(), json!({}));
}

// --- Snapshots and Subscriptions ---

#[test]
fn test_snapshots_never_change() {
    let (registry, dispatcher) = setup();
    let stores = register_app_stores(&registry).unwrap();

    let before = stores.kanban.snapshot();
    let before_json = before.to_json();

    dispatcher.dispatch(SyncMessage::update(KANBAN, "tasks.0.title", "Renamed"));
    dispatcher.dispatch(SyncMessage::delete(KANBAN, "tasks.2"));
    dispatcher.dispatch(SyncMessage::append(KANBAN, "users", "berel"));

    assert_eq!(before.to_json(), before_json);

    let after = stores.kanban.snapshot();
    assert!(!after.same_ref(&before));
    assert!(after.get("lists").unwrap().same_ref(before.get("lists").unwrap()));
    assert!(after.get("comments").unwrap().same_ref(before.get("comments").unwrap()));
}

#[test]
fn test_subscribers_see_every_write_in_order() {
    let (registry, dispatcher) = setup();
    register_app_stores(&registry).unwrap();

    let handle = registry.subscribe(SubscriptionConfig {
        filter: SubscriptionFilter::keys(vec![TODOS.to_string()]),
        replay_current: true,
        ..Default::default()
    });

    dispatcher.dispatch(SyncMessage::append(TODOS, "", todo(1, "a", false)));
    dispatcher.dispatch(SyncMessage::append(KANBAN, "users", "ignored"));
    dispatcher.dispatch(SyncMessage::append(TODOS, "", todo(2, "b", false)));

    let mut seen = Vec::new();
    while let Ok(event) = handle.recv_timeout(Duration::from_millis(100)) {
        match event {
            StoreEvent::StateChanged {
                key,
                version,
                operation,
                state,
            } => {
                assert_eq!(key, TODOS);
                let len = state.as_array().map(<[_]>::len).unwrap_or(0);
                seen.push((version, operation, len));
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    assert_eq!(
        seen,
        vec![
            (Version(0), OperationKind::Replace, 0),
            (Version(1), OperationKind::Append, 1),
            (Version(2), OperationKind::Append, 2),
        ]
    );
}

#[test]
fn test_out_of_order_stamps() {
    let (registry, dispatcher) = setup();
    let todos = registry.register("Todos", StateValue::empty_array()).unwrap();

    // The response to request 2 arrives before the response to request 1.
    let newer = SyncMessage::state_sender("Todos", json!([todo(1, "a", true)])).with_version(2);
    let older = SyncMessage::state_sender("Todos", json!([todo(1, "a", false)])).with_version(1);

    assert!(dispatcher.dispatch(newer).is_applied());
    assert!(!dispatcher.dispatch(older).is_applied());
    assert_eq!(todos.get().unwrap().to_json(), json!([todo(1, "a", true)]));
}

#[test]
fn test_dispatch_from_worker_threads() {
    let (registry, dispatcher) = setup();
    let dispatcher = Arc::new(dispatcher);
    for key in ["A", "B", "C", "D"] {
        registry.register(key, StateValue::empty_array()).unwrap();
    }

    let workers: Vec<_> = ["A", "B", "C", "D"]
        .into_iter()
        .map(|key| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                for i in 0..250 {
                    dispatcher.dispatch(SyncMessage::append(key, "", json!(i)));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    for key in ["A", "B", "C", "D"] {
        let store = registry.get_store(key).unwrap();
        let items = store.state().to_json();
        let expected: Vec<i64> = (0..250).collect();
        assert_eq!(items, json!(expected));
        assert_eq!(store.version(), Version(250));
    }
    assert_eq!(registry.stats().total_writes, 1000);
}
