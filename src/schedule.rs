//! Short deferred tasks, polled once per frame by the host.

use std::time::{Duration, Instant};

/// Tasks waiting for a deadline. Ties run in scheduling order.
#[derive(Debug, Clone)]
pub struct DeferredQueue<T> {
    pending: Vec<(Instant, T)>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_after(&mut self, now: Instant, delay: Duration, task: T) {
        let due = now + delay;
        // Keep sorted by deadline; insert after any task due at the same time.
        let slot = self.pending.partition_point(|(at, _)| *at <= due);
        self.pending.insert(slot, (due, task));
    }

    /// Remove and return every task due at or before `now`.
    pub fn take_due(&mut self, now: Instant) -> Vec<T> {
        let ready = self.pending.partition_point(|(at, _)| *at <= now);
        self.pending.drain(..ready).map(|(_, task)| task).collect()
    }

    /// Drop every pending task whose payload matches `predicate`.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        self.pending.retain(|(_, task)| !predicate(task));
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.first().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn tasks_run_only_once_due() {
        let start = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule_after(start, ms(50), "anchor");
        queue.schedule_after(start, ms(100), "rebind");

        assert!(queue.take_due(start + ms(10)).is_empty());
        assert_eq!(queue.take_due(start + ms(50)), vec!["anchor"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.take_due(start + ms(500)), vec!["rebind"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn due_tasks_come_out_in_deadline_order() {
        let start = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule_after(start, ms(100), 3);
        queue.schedule_after(start, ms(20), 1);
        queue.schedule_after(start, ms(20), 2);

        assert_eq!(queue.next_due(), Some(start + ms(20)));
        assert_eq!(queue.take_due(start + ms(200)), vec![1, 2, 3]);
        assert_eq!(queue.next_due(), None);
    }

    #[test]
    fn cancellation_drops_pending_tasks() {
        let start = Instant::now();
        let mut queue = DeferredQueue::new();
        queue.schedule_after(start, ms(10), 1);
        queue.schedule_after(start, ms(10), 2);
        queue.cancel_where(|task| *task == 1);
        assert_eq!(queue.take_due(start + ms(10)), vec![2]);

        queue.schedule_after(start, ms(10), 3);
        queue.cancel_all();
        assert!(queue.take_due(start + ms(10)).is_empty());
    }
}
