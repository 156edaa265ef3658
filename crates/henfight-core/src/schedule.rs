use crate::time::SimTime;

/// Handle returned by [`Scheduler::schedule_at`], used to cancel a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    due: SimTime,
    task: T,
}

/// One-shot delayed tasks keyed to the simulation clock.
///
/// Tasks never run on their own; the owner calls [`Scheduler::drain_due`]
/// from its tick. Dropping the scheduler drops every pending task, so an
/// owner that goes away takes its delayed effects with it.
#[derive(Debug)]
pub struct Scheduler<T> {
    pending: Vec<Scheduled<T>>,
    next_id: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }

    pub fn schedule_at(&mut self, due: SimTime, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_id);
        self.next_id += 1;
        self.pending.push(Scheduled { handle, due, task });
        handle
    }

    /// Remove a pending task. Returns it if it had not run yet.
    pub fn cancel(&mut self, handle: TaskHandle) -> Option<T> {
        let idx = self.pending.iter().position(|s| s.handle == handle)?;
        Some(self.pending.remove(idx).task)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|s| s.handle == handle)
    }

    /// Earliest due time among pending tasks.
    pub fn next_due(&self) -> Option<SimTime> {
        self.pending.iter().map(|s| s.due).reduce(f32::min)
    }

    /// Remove and return every task due at or before `now`, earliest first.
    /// Tasks with equal due times come out in the order they were scheduled.
    pub fn drain_due(&mut self, now: SimTime) -> Vec<T> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].due <= now {
                due.push(self.pending.remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.0.cmp(&b.handle.0)));
        due.into_iter().map(|s| s.task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_due_before_time() {
        let mut s = Scheduler::new();
        s.schedule_at(1.0, "hide");
        assert!(s.drain_due(0.5).is_empty());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn drains_in_due_order() {
        let mut s = Scheduler::new();
        s.schedule_at(2.0, "b");
        s.schedule_at(1.0, "a");
        s.schedule_at(2.0, "c");
        s.schedule_at(5.0, "later");
        assert_eq!(s.drain_due(3.0), vec!["a", "b", "c"]);
        assert_eq!(s.next_due(), Some(5.0));
    }

    #[test]
    fn task_due_exactly_now_runs() {
        let mut s = Scheduler::new();
        s.schedule_at(0.5, 1);
        assert_eq!(s.drain_due(0.5), vec![1]);
        assert!(s.is_empty());
    }

    #[test]
    fn cancelled_task_never_runs() {
        let mut s = Scheduler::new();
        let h = s.schedule_at(1.0, "hide");
        assert!(s.is_pending(h));
        assert_eq!(s.cancel(h), Some("hide"));
        assert!(!s.is_pending(h));
        assert_eq!(s.cancel(h), None);
        assert!(s.drain_due(10.0).is_empty());
    }
}
