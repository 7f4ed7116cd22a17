use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Deferred host-side transitions. Each task names the round it belongs to so
/// a task that outlives its round is recognisably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Task {
    AdvanceRound { round_number: u32 },
    BotSubmit { round_number: u32 },
}

#[derive(Debug, Default)]
pub struct Schedule {
    entries: Vec<(Task, Instant)>,
}

impl Schedule {
    /// Arms `task` to fire `after` from `now`. An identical pending task is replaced.
    pub fn set(&mut self, task: Task, now: Instant, after: Duration) {
        self.entries.retain(|(t, _)| t != &task);
        self.entries.push((task, now + after));
    }

    pub fn is_pending(&self, task: &Task) -> bool {
        self.entries.iter().any(|(t, _)| t == task)
    }

    pub fn cancel_where<F>(&mut self, predicate: F)
    where
        F: Fn(&Task) -> bool,
    {
        self.entries.retain(|(t, _)| !predicate(t));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Removes and returns every task due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<Task> {
        let mut due: Vec<(Task, Instant)> = vec![];
        self.entries.retain(|&(task, at)| {
            if at <= now {
                due.push((task, at));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|&(_, at)| at);
        due.into_iter().map(|(task, _)| task).collect()
    }

    /// Pending tasks with the time each has left at `now`, earliest first.
    pub fn remaining(&self, now: Instant) -> Vec<(Task, Duration)> {
        let mut left: Vec<(Task, Duration)> = self
            .entries
            .iter()
            .map(|&(task, at)| (task, at.saturating_duration_since(now)))
            .collect();
        left.sort_by_key(|&(_, after)| after);
        left
    }

    pub fn pending(&self) -> Vec<Task> {
        self.entries.iter().map(|&(task, _)| task).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use crate::schedule::{Schedule, Task};

    #[test]
    fn take_due_should_return_expired_tasks_in_deadline_order() {
        let now = Instant::now();
        let mut schedule = Schedule::default();
        schedule.set(Task::AdvanceRound { round_number: 1 }, now, ms(300));
        schedule.set(Task::BotSubmit { round_number: 1 }, now, ms(100));
        schedule.set(Task::BotSubmit { round_number: 2 }, now, ms(900));

        assert!(schedule.take_due(now).is_empty());
        assert_eq!(
            schedule.take_due(now + ms(500)),
            vec![
                Task::BotSubmit { round_number: 1 },
                Task::AdvanceRound { round_number: 1 }
            ]
        );
        assert_eq!(schedule.pending(), vec![Task::BotSubmit { round_number: 2 }]);
    }

    #[test]
    fn set_should_replace_an_identical_task() {
        let now = Instant::now();
        let mut schedule = Schedule::default();
        schedule.set(Task::BotSubmit { round_number: 1 }, now, ms(100));
        schedule.set(Task::BotSubmit { round_number: 1 }, now, ms(700));

        assert!(schedule.take_due(now + ms(200)).is_empty());
        assert_eq!(
            schedule.remaining(now + ms(200)),
            vec![(Task::BotSubmit { round_number: 1 }, ms(500))]
        );
    }

    #[test]
    fn remaining_should_not_go_below_zero() {
        let now = Instant::now();
        let mut schedule = Schedule::default();
        schedule.set(Task::AdvanceRound { round_number: 2 }, now, ms(3000));
        schedule.set(Task::BotSubmit { round_number: 2 }, now, ms(100));

        assert_eq!(
            schedule.remaining(now + ms(1000)),
            vec![
                (Task::BotSubmit { round_number: 2 }, Duration::ZERO),
                (Task::AdvanceRound { round_number: 2 }, ms(2000))
            ]
        );
    }

    #[test]
    fn cancel_where_should_drop_matching_tasks() {
        let now = Instant::now();
        let mut schedule = Schedule::default();
        schedule.set(Task::AdvanceRound { round_number: 3 }, now, ms(1));
        schedule.set(Task::BotSubmit { round_number: 3 }, now, ms(1));

        schedule.cancel_where(|t| matches!(t, Task::AdvanceRound { .. }));

        assert!(!schedule.is_pending(&Task::AdvanceRound { round_number: 3 }));
        assert!(schedule.is_pending(&Task::BotSubmit { round_number: 3 }));
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }
}
