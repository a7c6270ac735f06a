#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use time::Time;
use uuid::Uuid;

use crate::error::TicklerError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// How a task asks to be reminded. Exactly one mode per task, fixed at
/// creation; the old reminder-time-string-plus-boolean pair collapses into
/// this enum so the two can never both be set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderMode {
    FixedTime(Time),
    Random,
}

impl ReminderMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::FixedTime(_) => "fixed",
            Self::Random => "random",
        }
    }

    #[must_use]
    pub fn reminder_time(self) -> Option<Time> {
        match self {
            Self::FixedTime(t) => Some(t),
            Self::Random => None,
        }
    }
}

/// Caller-facing reminder request, validated into a `ReminderMode` when the
/// task is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderSpec {
    At(String),
    Random,
}

impl ReminderSpec {
    pub fn into_mode(self) -> Result<ReminderMode, TicklerError> {
        match self {
            Self::At(s) => Ok(ReminderMode::FixedTime(parse_reminder_time(&s)?)),
            Self::Random => Ok(ReminderMode::Random),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub mode: ReminderMode,
    pub completed: bool,
}

impl Task {
    #[must_use]
    pub fn new(title: String, description: String, priority: Priority, mode: ReminderMode) -> Self {
        Self {
            id: Self::new_id(),
            title,
            description,
            priority,
            mode,
            completed: false,
        }
    }

    #[must_use]
    pub fn new_id() -> String {
        let id = Uuid::new_v4().simple().to_string();
        id.chars().take(8).collect()
    }
}

/// Parses a wall-clock "HH:MM" reminder time. Rejected here, at creation
/// time, so a malformed string never reaches the scheduler.
pub fn parse_reminder_time(input: &str) -> Result<Time, TicklerError> {
    let bad = || TicklerError::InvalidTimeFormat(input.to_owned());

    let (h, m) = input.trim().split_once(':').ok_or_else(bad)?;
    let hour: u8 = h.parse().map_err(|_| bad())?;
    let minute: u8 = m.parse().map_err(|_| bad())?;
    Time::from_hms(hour, minute, 0).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_times() {
        for (input, hour, minute) in [
            ("00:00", 0, 0),
            ("09:00", 9, 0),
            ("9:5", 9, 5),
            ("23:59", 23, 59),
            (" 12:30 ", 12, 30),
        ] {
            let t = parse_reminder_time(input).unwrap();
            assert_eq!((t.hour(), t.minute()), (hour, minute), "input {input:?}");
        }
    }

    #[test]
    fn rejects_malformed_times() {
        for input in ["", "9", "09-00", "24:00", "12:60", "aa:bb", "12:30:00", "-1:10"] {
            let err = parse_reminder_time(input).unwrap_err();
            assert!(
                matches!(err, TicklerError::InvalidTimeFormat(_)),
                "input {input:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn mode_labels_and_time_accessor() {
        let fixed = ReminderSpec::At("08:15".to_owned()).into_mode().unwrap();
        assert_eq!(fixed.label(), "fixed");
        assert_eq!(
            fixed.reminder_time().map(|t| (t.hour(), t.minute())),
            Some((8, 15))
        );

        let random = ReminderSpec::Random.into_mode().unwrap();
        assert_eq!(random.label(), "random");
        assert_eq!(random.reminder_time(), None);
    }

    #[test]
    fn new_task_starts_uncompleted_with_unique_id() {
        let a = Task::new(
            "a".to_owned(),
            String::new(),
            Priority::High,
            ReminderMode::Random,
        );
        let b = Task::new(
            "b".to_owned(),
            String::new(),
            Priority::Low,
            ReminderMode::Random,
        );
        assert!(!a.completed);
        assert_ne!(a.id, b.id);
        assert_eq!(a.id.len(), 8);
    }
}
