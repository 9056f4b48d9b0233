use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, trace};

use crate::task::{Task, TaskId, TaskPatch};

/// Immutable snapshot of every task, keyed by id.
///
/// Each mutating operation returns a new snapshot and leaves the receiver
/// untouched. Snapshots share their entries, so producing one costs a map
/// of pointers rather than a copy of every task. An operation that changes
/// nothing hands back a snapshot with the same identity as its input.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Arc<BTreeMap<TaskId, Arc<Task>>>,
    version: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store; a later task overwrites an earlier one with the same id.
    pub fn from_tasks<I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = Task>,
    {
        let tasks: BTreeMap<TaskId, Arc<Task>> = tasks
            .into_iter()
            .map(|task| (task.id.clone(), Arc::new(task)))
            .collect();
        Self {
            tasks: Arc::new(tasks),
            version: 0,
        }
    }

    /// Incremented by every operation that changed the contents.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// True when both handles point at the very same snapshot.
    pub fn same_snapshot(&self, other: &TaskStore) -> bool {
        Arc::ptr_eq(&self.tasks, &other.tasks)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values().map(Arc::as_ref)
    }

    pub fn tasks_on(&self, date: NaiveDate) -> impl Iterator<Item = &Task> {
        self.iter().filter(move |task| task.date == date)
    }

    /// Inserts `task`, replacing any task with the same id.
    #[must_use]
    pub fn add(&self, task: Task) -> TaskStore {
        if self.get(task.id.as_str()) == Some(&task) {
            trace!(id = %task.id, "add with identical task; keeping snapshot");
            return self.clone();
        }
        debug!(id = %task.id, date = %task.date, "adding task");
        self.with_tasks(|tasks| {
            tasks.insert(task.id.clone(), Arc::new(task));
        })
    }

    #[must_use]
    pub fn delete(&self, id: &str) -> TaskStore {
        if !self.contains(id) {
            debug!(id, "delete of unknown task ignored");
            return self.clone();
        }
        debug!(id, "deleting task");
        self.with_tasks(|tasks| {
            tasks.remove(id);
        })
    }

    /// Merges `patch` into the task with `id`; unknown ids are a no-op.
    #[must_use]
    pub fn update(&self, id: &str, patch: &TaskPatch) -> TaskStore {
        if patch.is_empty() {
            trace!(id, "empty patch; keeping snapshot");
            return self.clone();
        }
        let Some(existing) = self.get(id) else {
            debug!(id, "update of unknown task ignored");
            return self.clone();
        };

        let mut next = existing.clone();
        if !next.apply(patch) {
            trace!(id, "update changed nothing; keeping snapshot");
            return self.clone();
        }

        debug!(id, date = %next.date, "updated task");
        self.with_tasks(|tasks| {
            tasks.insert(next.id.clone(), Arc::new(next));
        })
    }

    /// Reschedules a task. Moving a task onto its current date is a no-op.
    #[must_use]
    pub fn move_to_date(&self, id: &str, date: NaiveDate) -> TaskStore {
        self.update(id, &TaskPatch::date(date))
    }

    fn with_tasks<F>(&self, edit: F) -> TaskStore
    where
        F: FnOnce(&mut BTreeMap<TaskId, Arc<Task>>),
    {
        let mut tasks = BTreeMap::clone(&self.tasks);
        edit(&mut tasks);
        TaskStore {
            tasks: Arc::new(tasks),
            version: self.version + 1,
        }
    }
}
