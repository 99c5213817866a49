//! Property tests for live-event reconciliation.
//!
//! Drives the store with arbitrary interleavings of created/updated/deleted
//! events and checks it against a simple map model: ids stay unique, a
//! trailing delete leaves the id absent, and the surviving value is the
//! last write (with creates losing to an existing entry, echo semantics).

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};

use proptest::collection::vec;
use proptest::prelude::*;

use taskdeck::store::TaskStore;
use taskdeck_api::event::TaskEvent;
use taskdeck_api::task::{Owner, Task, TaskId};

/// A reconciliation event over a small id space.
#[derive(Debug, Clone)]
enum Op {
    Created { id: u8, title: String, done: bool },
    Updated { id: u8, title: String, done: bool },
    Deleted { id: u8 },
}

fn make_task(id: u8, title: &str, done: bool) -> Task {
    Task {
        id: TaskId::new(format!("t{id}")),
        title: title.to_string(),
        done,
        created_at: "2025-11-03T10:15:30.000Z".to_string(),
        owner: Owner {
            id: 7,
            username: "alice".to_string(),
            fullname: "Alice Example".to_string(),
        },
    }
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..5u8, "[a-z]{1,8}", any::<bool>())
            .prop_map(|(id, title, done)| Op::Created { id, title, done }),
        (0..5u8, "[a-z]{1,8}", any::<bool>())
            .prop_map(|(id, title, done)| Op::Updated { id, title, done }),
        (0..5u8).prop_map(|id| Op::Deleted { id }),
    ]
}

proptest! {
    #[test]
    fn reconciliation_matches_map_model(ops in vec(op_strategy(), 0..48)) {
        let store = TaskStore::new();
        // Model: id -> (title, done). Created inserts only when absent
        // (echo idempotence), Updated upserts, Deleted removes.
        let mut model: HashMap<u8, (String, bool)> = HashMap::new();

        for op in ops {
            match op {
                Op::Created { id, title, done } => {
                    store.apply_event(TaskEvent::Created(make_task(id, &title, done)));
                    model.entry(id).or_insert((title, done));
                }
                Op::Updated { id, title, done } => {
                    store.apply_event(TaskEvent::Updated(make_task(id, &title, done)));
                    model.insert(id, (title, done));
                }
                Op::Deleted { id } => {
                    store.apply_event(TaskEvent::Deleted {
                        id: TaskId::new(format!("t{id}")),
                    });
                    model.remove(&id);
                }
            }

            // Ids are unique after every single step.
            let tasks = store.tasks();
            let mut seen = HashSet::new();
            for task in &tasks {
                prop_assert!(seen.insert(task.id.clone()), "duplicate id {}", task.id);
            }
        }

        // The final store agrees with the model exactly.
        let tasks = store.tasks();
        prop_assert_eq!(tasks.len(), model.len());
        for task in tasks {
            let id: u8 = task.id.as_str().trim_start_matches('t').parse().unwrap();
            let (title, done) = model.get(&id).expect("task missing from model");
            prop_assert_eq!(&task.title, title);
            prop_assert_eq!(task.done, *done);
        }
    }

    #[test]
    fn trailing_delete_always_removes_the_id(
        prefix in vec(op_strategy(), 0..24),
        id in 0..5u8,
    ) {
        let store = TaskStore::new();
        for op in prefix {
            match op {
                Op::Created { id, title, done } => {
                    store.apply_event(TaskEvent::Created(make_task(id, &title, done)));
                }
                Op::Updated { id, title, done } => {
                    store.apply_event(TaskEvent::Updated(make_task(id, &title, done)));
                }
                Op::Deleted { id } => {
                    store.apply_event(TaskEvent::Deleted {
                        id: TaskId::new(format!("t{id}")),
                    });
                }
            }
        }

        store.apply_event(TaskEvent::Deleted {
            id: TaskId::new(format!("t{id}")),
        });
        let deleted_id = TaskId::new(format!("t{id}"));
        prop_assert!(store.task(&deleted_id).is_none());
    }
}
