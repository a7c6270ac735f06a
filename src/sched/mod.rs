#![forbid(unsafe_code)]

pub mod alarm;
pub mod sampler;

use tokio::sync::mpsc;

use crate::task::Priority;

/// Which scheduling path produced a reminder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderKind {
    Fixed,
    Random,
}

impl ReminderKind {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Random => "random",
        }
    }
}

/// Notification handed to the UI collaborator. Emitted from scheduler
/// threads; the consumer side of the channel is the marshalling boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderEvent {
    pub task_id: String,
    pub title: String,
    pub priority: Priority,
    pub kind: ReminderKind,
}

pub type EventSender = mpsc::UnboundedSender<ReminderEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ReminderEvent>;

#[must_use]
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
