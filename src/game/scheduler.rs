use log::trace;
use std::collections::BTreeMap;
use std::time::Duration;

/// Handle for a pending task; pass it to `cancel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

/// Virtual-time task queue. Nothing fires on its own: the owner moves the
/// clock forward and pulls due tokens one at a time, so a task scheduled
/// while handling another one can still come due in the same advance.
#[derive(Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    tasks: BTreeMap<(Duration, TaskHandle), T>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            tasks: BTreeMap::new(),
        }
    }
}

impl<T: std::fmt::Debug> Scheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule_after(&mut self, delay: Duration, token: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        trace!(target: "scheduler", "Scheduling {:?} in {:?}", token, delay);
        self.tasks.insert((self.now + delay, handle), token);
        handle
    }

    /// Returns the token if the task was still pending.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let key = self.tasks.keys().find(|(_, h)| *h == handle).copied()?;
        self.tasks.remove(&key)
    }

    pub fn cancel_all(&mut self) {
        if !self.tasks.is_empty() {
            trace!(target: "scheduler", "Cancelling {} tasks", self.tasks.len());
        }
        self.tasks.clear();
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.keys().any(|(_, h)| *h == handle)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Removes and returns the earliest task due at or before `until`, moving
    /// the clock to its deadline. Equal deadlines come out in scheduling
    /// order.
    pub fn pop_due(&mut self, until: Duration) -> Option<T> {
        let (&(deadline, handle), _) = self.tasks.first_key_value()?;
        if deadline > until {
            return None;
        }
        self.now = self.now.max(deadline);
        self.tasks.remove(&(deadline, handle))
    }

    /// Moves the clock forward without firing anything; call after draining
    /// `pop_due`.
    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }
}
