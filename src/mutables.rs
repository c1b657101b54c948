//! Application stores: the todo list, the kanban board and the people list.
//!
//! These are the shapes the server's sync messages target. Views read them
//! through the typed handles in [`AppStores`].

use crate::error::Result;
use crate::registry::{StoreHandle, StoreRegistry};
use serde::{Deserialize, Serialize};

pub const TODOS: &str = "Todos";
pub const KANBAN: &str = "Kanban";
pub const PERSONS: &str = "Persons";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub title: String,
    pub done: bool,
    pub id: i64,
    pub estimated_time: String,
    pub created_at: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
    pub email: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kanban {
    pub lists: Vec<String>,
    pub tasks: Vec<Task>,
    pub comments: Vec<Comment>,
    pub users: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub list: String,
    pub author: String,
    pub time: String,
    pub deadline: String,
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub body: String,
    pub author: String,
    pub task_id: i64,
}

impl Kanban {
    pub fn tasks_in<'a>(&'a self, list: &'a str) -> impl Iterator<Item = &'a Task> + 'a {
        self.tasks.iter().filter(move |task| task.list == list)
    }

    pub fn comments_on(&self, task_id: i64) -> impl Iterator<Item = &Comment> + '_ {
        self.comments
            .iter()
            .filter(move |comment| comment.task_id == task_id)
    }
}

/// Seed board shown before the first server sync.
pub fn initial_kanban() -> Kanban {
    let task = |title: &str, list: &str, author: &str, id: i64| Task {
        title: title.to_string(),
        list: list.to_string(),
        author: author.to_string(),
        time: "2025-08-09 21:13:09".to_string(),
        deadline: "2025-08-09 21:13:09".to_string(),
        id,
    };
    let comment = |id: i64, body: &str, author: &str, task_id: i64| Comment {
        id,
        body: body.to_string(),
        author: author.to_string(),
        task_id,
    };

    Kanban {
        lists: vec!["To Do".into(), "In Progress".into(), "Done".into()],
        tasks: vec![
            task("Task 1", "To Do", "Shmuli", 1),
            task("Task 2", "In Progress", "Shmuli", 2),
            task("Task 3", "Done", "yosef", 3),
        ],
        comments: vec![
            comment(1, "Comment 1", "Shmuli", 1),
            comment(2, "Comment 2", "yosef", 3),
        ],
        users: vec!["Shmuli".into(), "yosef".into()],
    }
}

pub fn initial_persons() -> Vec<Person> {
    vec![
        Person {
            name: "shmuli".into(),
            age: 21,
            email: "shmuli@shmuli.com".into(),
        },
        Person {
            name: "berel".into(),
            age: 25,
            email: "berel@shmuli.com".into(),
        },
    ]
}

/// Typed handles to the application stores.
#[derive(Clone)]
pub struct AppStores {
    pub todos: StoreHandle<Vec<Todo>>,
    pub kanban: StoreHandle<Kanban>,
    pub persons: StoreHandle<Vec<Person>>,
}

/// Register the application stores with their seed state. Todos start empty
/// and are filled by the server.
pub fn register_app_stores(registry: &StoreRegistry) -> Result<AppStores> {
    Ok(AppStores {
        todos: registry.register_typed(TODOS, &Vec::<Todo>::new())?,
        kanban: registry.register_typed(KANBAN, &initial_kanban())?,
        persons: registry.register_typed(PERSONS, &initial_persons())?,
    })
}
