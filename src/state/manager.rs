//! Manager - scheduling and orchestration over a [`Store`].
//!
//! The store only guards individual calls. The manager adds a coarse lock so
//! each of its operations (fetch, mutate, write back) runs as one unit with
//! respect to other manager callers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{Iteration, Task, TaskStatus};
use crate::state::Store;
use crate::{tlog, tlog_debug, tlog_error, Error, Result};

/// Scheduling policy and lifecycle operations for the task queue.
#[derive(Debug)]
pub struct Manager {
    store: Arc<Store>,
    lock: Mutex<()>,
    autosave: bool,
}

impl Manager {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
            autosave: false,
        }
    }

    /// Persist the store after every mutating operation.
    pub fn with_autosave(mut self, autosave: bool) -> Self {
        self.autosave = autosave;
        self
    }

    /// Shared handle to the underlying store, for read-only polling.
    pub fn store(&self) -> Arc<Store> {
        Arc::clone(&self.store)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn save(&self) -> Result<()> {
        let _guard = self.guard();
        self.store.save()
    }

    /// Write `task` back, restoring `previous` when the autosave fails so a
    /// failed operation leaves no visible effect.
    fn persist(&self, previous: Task, task: Task) -> Result<()> {
        self.store.update(task)?;
        self.autosave_or_restore(vec![previous])
    }

    fn autosave_or_restore(&self, previous: Vec<Task>) -> Result<()> {
        if !self.autosave {
            return Ok(());
        }
        let Err(e) = self.store.save() else {
            return Ok(());
        };
        tlog_error!("Manager: save failed, rolling back {} tasks: {}", previous.len(), e);
        for task in previous {
            if let Err(restore) = self.store.update(task) {
                tlog_error!("Manager: rollback failed: {}", restore);
            }
        }
        Err(e)
    }

    fn fetch(&self, id: &str) -> Result<Task> {
        self.store
            .get(id)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Tasks stable-sorted by ascending order; ties keep stored order.
    fn sorted(&self) -> Vec<Task> {
        let mut tasks = self.store.tasks();
        tasks.sort_by_key(|t| t.order);
        tasks
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        let _guard = self.guard();
        self.store.get(id)
    }

    /// Select the task to work on next.
    ///
    /// Priority: an `InProgress` task (an interrupted attempt) first, then a
    /// `Paused` task, then a `Pending` one. Within a class the lowest order
    /// wins.
    pub fn get_next(&self) -> Option<Task> {
        let _guard = self.guard();
        let tasks = self.sorted();

        let next = [
            TaskStatus::InProgress,
            TaskStatus::Paused,
            TaskStatus::Pending,
        ]
        .into_iter()
        .find_map(|status| tasks.iter().find(|t| t.status == status))
        .cloned();

        tlog_debug!(
            "Manager::get_next -> {:?}",
            next.as_ref().map(|t| t.id.as_str())
        );
        next
    }

    fn apply(&self, id: &str, mutate: impl FnOnce(&mut Task)) -> Result<()> {
        let _guard = self.guard();
        let previous = self.fetch(id)?;
        let mut task = previous.clone();
        mutate(&mut task);
        tlog_debug!("Manager: task {} -> {}", id, task.status);
        self.persist(previous, task)
    }

    pub fn mark_complete(&self, id: &str) -> Result<()> {
        self.apply(id, Task::mark_completed)?;
        tlog!("Task completed: {}", id);
        Ok(())
    }

    pub fn mark_skip(&self, id: &str) -> Result<()> {
        self.apply(id, Task::mark_skipped)
    }

    pub fn mark_pause(&self, id: &str) -> Result<()> {
        self.apply(id, Task::mark_paused)
    }

    pub fn mark_fail(&self, id: &str) -> Result<()> {
        self.apply(id, Task::mark_failed)?;
        tlog!("Task failed: {}", id);
        Ok(())
    }

    /// Open a new iteration on the task and mark it in progress.
    ///
    /// Terminal tasks are not rejected here; callers should only start
    /// iterations on tasks returned by [`Manager::get_next`].
    pub fn start_iteration(&self, id: &str) -> Result<Iteration> {
        let _guard = self.guard();
        let previous = self.fetch(id)?;
        let mut task = previous.clone();
        let iteration = task.start_iteration();
        tlog_debug!("Manager: task {} iteration {} started", id, iteration.number);
        self.persist(previous, task)?;
        Ok(iteration)
    }

    pub fn end_iteration(
        &self,
        id: &str,
        result: &str,
        output: &str,
        session_id: &str,
    ) -> Result<()> {
        let _guard = self.guard();
        let previous = self.fetch(id)?;
        let mut task = previous.clone();
        task.end_iteration(result, output, session_id)?;
        tlog_debug!("Manager: task {} iteration ended result={}", id, result);
        self.persist(previous, task)
    }

    /// Resume a paused task by starting a new iteration.
    pub fn resume(&self, id: &str) -> Result<Iteration> {
        let _guard = self.guard();
        let previous = self.fetch(id)?;
        let mut task = previous.clone();
        let iteration = task.resume().ok_or_else(|| Error::NotPaused {
            id: id.to_string(),
            status: previous.status,
        })?;
        self.persist(previous, task)?;
        Ok(iteration)
    }

    /// Tasks that are pending, in progress or paused.
    pub fn count_remaining(&self) -> usize {
        let _guard = self.guard();
        self.store
            .tasks()
            .iter()
            .filter(|t| !t.is_terminal())
            .count()
    }

    pub fn count_completed(&self) -> usize {
        let _guard = self.guard();
        self.store.count_by_status(TaskStatus::Completed)
    }

    pub fn count_total(&self) -> usize {
        let _guard = self.guard();
        self.store.count()
    }

    pub fn has_remaining(&self) -> bool {
        self.count_remaining() > 0
    }

    /// `(completed, total)` taken from one snapshot.
    pub fn progress(&self) -> (usize, usize) {
        let _guard = self.guard();
        let tasks = self.store.tasks();
        let completed = tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count();
        (completed, tasks.len())
    }

    /// Every task, sorted by order.
    pub fn all(&self) -> Vec<Task> {
        let _guard = self.guard();
        self.sorted()
    }

    /// Renumber tasks so the named ids come first, in the given sequence.
    ///
    /// Tasks not named keep their relative stored order and follow the named
    /// ones. Unknown ids are ignored. Each task is written back on its own, so
    /// a failure part way leaves the earlier renumbering in place. A failed
    /// autosave restores the previous orders.
    pub fn reorder<S: AsRef<str>>(&self, ordered_ids: &[S]) -> Result<()> {
        let _guard = self.guard();
        let stored = self.store.tasks();

        let mut named = Vec::new();
        for id in ordered_ids {
            if let Some(task) = stored.iter().find(|t| t.id == id.as_ref()) {
                if !named.iter().any(|t: &&Task| t.id == task.id) {
                    named.push(task);
                }
            }
        }
        let rest = stored
            .iter()
            .filter(|t| !named.iter().any(|n| n.id == t.id));

        let sequence: Vec<&Task> = named.iter().copied().chain(rest).collect();
        for (position, task) in sequence.into_iter().enumerate() {
            let mut task = task.clone();
            task.order = position as u32 + 1;
            self.store.update(task)?;
        }
        tlog_debug!("Manager::reorder {} tasks", stored.len());
        self.autosave_or_restore(stored)
    }
}
