#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use time::{OffsetDateTime, Time};
use tokio::task::JoinHandle;

use crate::sched::{EventSender, ReminderEvent, ReminderKind};
use crate::task::Registry;

/// Arena of running fixed-time alarms, keyed by task id. Owning the handles
/// in one place keeps cancellation on task removal and bulk shutdown simple;
/// individual tasks never hold timer resources themselves.
#[derive(Debug, Default)]
pub struct AlarmSet {
    inner: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl AlarmSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawns a daily alarm for `task_id`, first firing at the next local
    /// occurrence of `at` and then every `period` thereafter.
    pub fn spawn(
        &self,
        task_id: String,
        at: Time,
        period: Duration,
        registry: Arc<Registry>,
        events: EventSender,
    ) {
        let initial = next_fire_delay(at, now_local());
        self.spawn_with_delay(task_id, initial, period, registry, events);
    }

    /// Same as [`spawn`](Self::spawn) with an explicit initial delay, so
    /// tests can run the alarm loop on compressed timings.
    pub fn spawn_with_delay(
        &self,
        task_id: String,
        initial: Duration,
        period: Duration,
        registry: Arc<Registry>,
        events: EventSender,
    ) {
        let id = task_id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(initial).await;
            loop {
                if !fire(&id, &registry, &events) {
                    break;
                }
                tokio::time::sleep(period).await;
            }
        });

        if let Some(old) = self.lock().insert(task_id, handle) {
            old.abort();
        }
    }

    /// Stops the alarm for `task_id`. Idempotent; unknown ids are a no-op.
    /// No fire is observable after this returns, aside from one already in
    /// flight on another worker thread.
    pub fn cancel(&self, task_id: &str) {
        if let Some(handle) = self.lock().remove(task_id) {
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.lock().drain() {
            handle.abort();
        }
    }

    #[must_use]
    pub fn contains(&self, task_id: &str) -> bool {
        self.lock().contains_key(task_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// One alarm cycle. Completion is re-checked on every cycle rather than at
/// schedule time, so un-completing a task resumes visible reminders without
/// rescheduling anything. Returns false once the task has left the registry.
fn fire(task_id: &str, registry: &Registry, events: &EventSender) -> bool {
    let Some(task) = registry.find(task_id) else {
        tracing::debug!(task_id, "task no longer registered; alarm loop ending");
        return false;
    };

    if task.completed {
        return true;
    }

    let event = ReminderEvent {
        task_id: task.id,
        title: task.title,
        priority: task.priority,
        kind: ReminderKind::Fixed,
    };
    if events.send(event).is_err() {
        tracing::warn!(task_id, "reminder receiver dropped; fixed reminder not delivered");
    }
    true
}

/// Delay until the next occurrence of `at`: today if strictly in the future,
/// otherwise tomorrow. Always positive and at most 24 hours.
#[must_use]
pub fn next_fire_delay(at: Time, now: OffsetDateTime) -> Duration {
    let today = now.replace_time(at);
    let target = if today > now {
        today
    } else {
        today + time::Duration::DAY
    };
    (target - now).try_into().unwrap_or(Duration::ZERO)
}

fn now_local() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
