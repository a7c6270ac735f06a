#![forbid(unsafe_code)]

use std::sync::Mutex;

use crate::error::TicklerError;
use crate::task::model::Task;

/// Ordered, insertion-order collection of live tasks, shared between the UI
/// side and the scheduler's timer tasks. Iteration hands out a snapshot so
/// the sampler never observes a half-applied mutation from the other side.
#[derive(Debug, Default)]
pub struct Registry {
    inner: Mutex<Vec<Task>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, task: Task) {
        self.lock().push(task);
    }

    pub fn get(&self, index: usize) -> Result<Task, TicklerError> {
        let tasks = self.lock();
        tasks
            .get(index)
            .cloned()
            .ok_or(TicklerError::IndexOutOfRange {
                index,
                len: tasks.len(),
            })
    }

    pub fn remove(&self, index: usize) -> Result<Task, TicklerError> {
        let mut tasks = self.lock();
        if index >= tasks.len() {
            return Err(TicklerError::IndexOutOfRange {
                index,
                len: tasks.len(),
            });
        }
        Ok(tasks.remove(index))
    }

    pub fn remove_by_id(&self, id: &str) -> Option<Task> {
        let mut tasks = self.lock();
        let pos = tasks.iter().position(|t| t.id == id)?;
        Some(tasks.remove(pos))
    }

    #[must_use]
    pub fn find(&self, id: &str) -> Option<Task> {
        self.lock().iter().find(|t| t.id == id).cloned()
    }

    /// Flips the completion flag, returning the new state.
    pub fn toggle_completed(&self, id: &str) -> Result<bool, TicklerError> {
        let mut tasks = self.lock();
        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TicklerError::TaskNotFound(id.to_owned()))?;
        task.completed = !task.completed;
        Ok(task.completed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Task>> {
        // Timer tasks never panic while holding the lock; a poisoned mutex
        // here means a bug elsewhere, so keep going with the inner data.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
