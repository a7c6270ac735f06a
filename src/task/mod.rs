#![forbid(unsafe_code)]

pub mod model;
pub mod registry;

pub use model::{Priority, ReminderMode, ReminderSpec, Task, parse_reminder_time};
pub use registry::Registry;
