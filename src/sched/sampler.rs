#![forbid(unsafe_code)]

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::sched::{EventSender, ReminderEvent, ReminderKind};
use crate::task::{Registry, ReminderMode, Task};

/// One sampling pass over a registry snapshot: every uncompleted
/// random-mode task independently draws from the shared rng with success
/// probability `probability`.
///
/// Kept separate from the timer loop so tests can run thousands of ticks
/// without waiting on a clock. `probability` must already be validated to
/// lie in [0, 1].
pub fn sample(tasks: &[Task], probability: f64, rng: &mut impl Rng) -> Vec<ReminderEvent> {
    let mut events = Vec::new();
    for task in tasks {
        if task.completed || task.mode != ReminderMode::Random {
            continue;
        }
        if rng.gen_bool(probability) {
            events.push(ReminderEvent {
                task_id: task.id.clone(),
                title: task.title.clone(),
                priority: task.priority,
                kind: ReminderKind::Random,
            });
        }
    }
    events
}

/// Spawns the single process-wide sampler tick. One shared timer for all
/// random-mode tasks bounds scheduling overhead to one pass over the
/// registry per period, however many tasks opt in.
///
/// Missed ticks are not caught up; a reminder the process slept through is
/// simply never fired.
pub fn spawn(
    registry: Arc<Registry>,
    events: EventSender,
    tick_interval: Duration,
    probability: f64,
    seed: Option<u64>,
) -> JoinHandle<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            for event in sample(&registry.snapshot(), probability, &mut rng) {
                if events.send(event).is_err() {
                    tracing::warn!("reminder receiver dropped; random reminder not delivered");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched::event_channel;
    use crate::task::{Priority, parse_reminder_time};

    fn random_task(title: &str) -> Task {
        Task::new(
            title.to_owned(),
            String::new(),
            Priority::Medium,
            ReminderMode::Random,
        )
    }

    #[test]
    fn seeded_fire_count_is_reproducible_and_near_expectation() {
        let tasks = vec![random_task("b")];

        let count = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..1000)
                .map(|_| sample(&tasks, 0.1, &mut rng).len())
                .sum::<usize>()
        };

        let fired = count(42);
        assert_eq!(fired, count(42), "same seed must reproduce the run");
        assert!(
            (70..=130).contains(&fired),
            "1000 ticks at p=0.1 fired {fired} times"
        );
    }

    #[test]
    fn zero_probability_never_fires() {
        let tasks = vec![random_task("never")];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(sample(&tasks, 0.0, &mut rng).is_empty());
        }
    }

    #[test]
    fn completed_and_fixed_mode_tasks_are_skipped() {
        let mut done = random_task("done");
        done.completed = true;
        let fixed = Task::new(
            "fixed".to_owned(),
            String::new(),
            Priority::High,
            ReminderMode::FixedTime(parse_reminder_time("09:00").unwrap()),
        );
        let live = random_task("live");
        let tasks = vec![done, fixed, live.clone()];

        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            for event in sample(&tasks, 1.0, &mut rng) {
                assert_eq!(event.task_id, live.id);
                assert_eq!(event.kind, ReminderKind::Random);
            }
        }
    }

    #[test]
    fn tasks_sample_independently_on_one_shared_rng() {
        let tasks: Vec<Task> = (0..4).map(|i| random_task(&format!("t{i}"))).collect();
        let mut rng = StdRng::seed_from_u64(99);
        let total: usize = (0..1000).map(|_| sample(&tasks, 0.1, &mut rng).len()).sum();
        // Expectation 400 across four tasks.
        assert!((280..=520).contains(&total), "total {total}");
    }

    #[tokio::test]
    async fn spawned_sampler_delivers_events() {
        let registry = Arc::new(Registry::new());
        registry.add(random_task("stretch"));

        let (tx, mut rx) = event_channel();
        let handle = spawn(
            Arc::clone(&registry),
            tx,
            Duration::from_millis(5),
            1.0,
            Some(3),
        );

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("sampler tick")
            .expect("event");
        assert_eq!(event.title, "stretch");
        assert_eq!(event.kind, ReminderKind::Random);

        handle.abort();
    }
}
