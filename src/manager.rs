#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::error::TicklerError;
use crate::sched::alarm::AlarmSet;
use crate::sched::{EventReceiver, EventSender, sampler};
use crate::task::{Priority, Registry, ReminderMode, ReminderSpec, Task};

/// Timer periods and sampling probability for the whole scheduler. Defaults
/// match production behavior; tests shrink them to run in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchedulerTiming {
    pub tick_interval: Duration,
    pub fire_probability: f64,
    pub recurrence: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5 * 60),
            fire_probability: 0.1,
            recurrence: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl SchedulerTiming {
    pub fn validate(&self) -> Result<(), TicklerError> {
        if self.tick_interval.is_zero() {
            return Err(TicklerError::Config(
                "scheduler.tick_interval must be positive".to_owned(),
            ));
        }
        if self.recurrence.is_zero() {
            return Err(TicklerError::Config(
                "scheduler.recurrence must be positive".to_owned(),
            ));
        }
        if !(0.0..=1.0).contains(&self.fire_probability) {
            return Err(TicklerError::Config(format!(
                "scheduler.fire_probability must be within [0, 1], got {}",
                self.fire_probability
            )));
        }
        Ok(())
    }
}

/// Creation request coming from the UI collaborator.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub reminder: ReminderSpec,
}

/// Read model handed back to the UI; plain strings where the UI only
/// displays the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub mode: &'static str,
    pub reminder_time: Option<String>,
    pub completed: bool,
}

impl From<Task> for TaskView {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            mode: task.mode.label(),
            reminder_time: task
                .mode
                .reminder_time()
                .map(|t| format!("{:02}:{:02}", t.hour(), t.minute())),
            completed: task.completed,
        }
    }
}

/// Facade the UI drives: task lifecycle on one side, the reminder event
/// channel on the other. All scheduling runs on tokio worker threads; the
/// receiver returned by [`TaskManager::new`] is the marshalling point back
/// to whatever thread does presentation.
#[derive(Debug)]
pub struct TaskManager {
    registry: Arc<Registry>,
    alarms: AlarmSet,
    events: EventSender,
    timing: SchedulerTiming,
    sampler: JoinHandle<()>,
}

impl TaskManager {
    /// Validates `timing`, starts the global sampler tick, and returns the
    /// manager together with the reminder event receiver. `seed` pins the
    /// sampler's rng for deterministic tests; production passes `None`.
    pub fn new(
        timing: SchedulerTiming,
        seed: Option<u64>,
    ) -> Result<(Self, EventReceiver), TicklerError> {
        timing.validate()?;

        let (tx, rx) = crate::sched::event_channel();
        let registry = Arc::new(Registry::new());
        let sampler = sampler::spawn(
            Arc::clone(&registry),
            tx.clone(),
            timing.tick_interval,
            timing.fire_probability,
            seed,
        );

        Ok((
            Self {
                registry,
                alarms: AlarmSet::new(),
                events: tx,
                timing,
                sampler,
            },
            rx,
        ))
    }

    /// Creates a task and, for fixed-time reminders, starts its daily alarm.
    /// A malformed "HH:MM" string is rejected here and nothing is added.
    pub fn create_task(&self, new: NewTask) -> Result<String, TicklerError> {
        let mode = new.reminder.into_mode()?;
        let task = Task::new(new.title, new.description, new.priority, mode);
        let id = task.id.clone();

        // Register before arming the alarm so the first fire finds the task.
        self.registry.add(task);
        if let ReminderMode::FixedTime(at) = mode {
            self.alarms.spawn(
                id.clone(),
                at,
                self.timing.recurrence,
                Arc::clone(&self.registry),
                self.events.clone(),
            );
        }
        Ok(id)
    }

    /// Cancels the task's alarm and removes it from the registry. Once this
    /// returns, no further reminders for the task are observable.
    pub fn delete_task(&self, id: &str) -> Result<(), TicklerError> {
        self.alarms.cancel(id);
        self.registry
            .remove_by_id(id)
            .map(|_| ())
            .ok_or_else(|| TicklerError::TaskNotFound(id.to_owned()))
    }

    /// Positional removal, for list-style UIs. The removed task's alarm is
    /// cancelled before this returns.
    pub fn remove_at(&self, index: usize) -> Result<TaskView, TicklerError> {
        let task = self.registry.remove(index)?;
        self.alarms.cancel(&task.id);
        Ok(task.into())
    }

    /// Flips completion, returning the new state. The alarm is untouched:
    /// a completed task's alarm keeps ticking silently and resumes visible
    /// fires if the task is un-completed later.
    pub fn toggle_completed(&self, id: &str) -> Result<bool, TicklerError> {
        self.registry.toggle_completed(id)
    }

    /// Stops the task's fixed-time alarm without removing the task.
    /// Idempotent; safe on random-mode tasks and on repeat calls.
    pub fn cancel_reminder(&self, id: &str) {
        self.alarms.cancel(id);
    }

    #[must_use]
    pub fn has_alarm(&self, id: &str) -> bool {
        self.alarms.contains(id)
    }

    pub fn task_view(&self, id: &str) -> Result<TaskView, TicklerError> {
        self.registry
            .find(id)
            .map(TaskView::from)
            .ok_or_else(|| TicklerError::TaskNotFound(id.to_owned()))
    }

    pub fn view_at(&self, index: usize) -> Result<TaskView, TicklerError> {
        self.registry.get(index).map(TaskView::from)
    }

    #[must_use]
    pub fn views(&self) -> Vec<TaskView> {
        self.registry
            .snapshot()
            .into_iter()
            .map(TaskView::from)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Aborts the sampler and every running alarm.
    pub fn shutdown(&self) {
        self.sampler.abort();
        self.alarms.cancel_all();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_timing(probability: f64) -> SchedulerTiming {
        SchedulerTiming {
            tick_interval: Duration::from_millis(5),
            fire_probability: probability,
            recurrence: Duration::from_millis(5),
        }
    }

    fn random_request(title: &str) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: String::new(),
            priority: Priority::Medium,
            reminder: ReminderSpec::Random,
        }
    }

    #[test]
    fn timing_validation_catches_bad_values() {
        let mut timing = SchedulerTiming::default();
        timing.validate().unwrap();

        timing.fire_probability = 1.5;
        assert!(matches!(timing.validate(), Err(TicklerError::Config(_))));

        timing = SchedulerTiming {
            tick_interval: Duration::ZERO,
            ..SchedulerTiming::default()
        };
        assert!(timing.validate().is_err());

        timing = SchedulerTiming {
            recurrence: Duration::ZERO,
            ..SchedulerTiming::default()
        };
        assert!(timing.validate().is_err());
    }

    #[tokio::test]
    async fn new_rejects_invalid_timing() {
        let timing = SchedulerTiming {
            fire_probability: -0.1,
            ..SchedulerTiming::default()
        };
        assert!(TaskManager::new(timing, None).is_err());
    }

    #[tokio::test]
    async fn malformed_time_is_rejected_and_nothing_is_added() {
        let (mgr, _rx) = TaskManager::new(SchedulerTiming::default(), None).unwrap();
        let err = mgr
            .create_task(NewTask {
                title: "bad".to_owned(),
                description: String::new(),
                priority: Priority::High,
                reminder: ReminderSpec::At("25:00".to_owned()),
            })
            .unwrap_err();
        assert!(matches!(err, TicklerError::InvalidTimeFormat(_)));
        assert!(mgr.is_empty());
    }

    #[tokio::test]
    async fn fixed_task_gets_an_alarm_and_removal_cancels_it() {
        let (mgr, _rx) = TaskManager::new(SchedulerTiming::default(), None).unwrap();
        let id = mgr
            .create_task(NewTask {
                title: "review".to_owned(),
                description: "open PRs".to_owned(),
                priority: Priority::High,
                reminder: ReminderSpec::At("09:00".to_owned()),
            })
            .unwrap();
        assert!(mgr.has_alarm(&id));

        let view = mgr.task_view(&id).unwrap();
        assert_eq!(view.mode, "fixed");
        assert_eq!(view.reminder_time.as_deref(), Some("09:00"));
        assert!(!view.completed);

        let removed = mgr.remove_at(0).unwrap();
        assert_eq!(removed.id, id);
        assert!(!mgr.has_alarm(&id));
        assert!(mgr.is_empty());
    }

    #[tokio::test]
    async fn random_task_reminders_flow_through_the_channel() {
        let (mgr, mut rx) = TaskManager::new(fast_timing(1.0), Some(11)).unwrap();
        let id = mgr.create_task(random_request("stretch")).unwrap();
        assert!(!mgr.has_alarm(&id), "random tasks own no alarm");

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("sampler fire")
            .expect("event");
        assert_eq!(event.task_id, id);
        assert_eq!(event.title, "stretch");
    }

    #[tokio::test]
    async fn delete_task_fails_on_stale_handle() {
        let (mgr, _rx) = TaskManager::new(SchedulerTiming::default(), None).unwrap();
        let id = mgr.create_task(random_request("once")).unwrap();

        mgr.delete_task(&id).unwrap();
        assert!(matches!(
            mgr.delete_task(&id),
            Err(TicklerError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn toggle_and_cancel_reminder_are_safe() {
        let (mgr, _rx) = TaskManager::new(SchedulerTiming::default(), None).unwrap();
        let id = mgr.create_task(random_request("t")).unwrap();

        assert!(mgr.toggle_completed(&id).unwrap());
        assert!(!mgr.toggle_completed(&id).unwrap());

        // No alarm was ever scheduled; cancelling must still be a no-op.
        mgr.cancel_reminder(&id);
        mgr.cancel_reminder(&id);

        assert!(matches!(
            mgr.remove_at(5),
            Err(TicklerError::IndexOutOfRange { index: 5, len: 1 })
        ));
    }
}
