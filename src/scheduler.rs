/// Delayed task scheduling and debouncing
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after a delay on the current event loop
pub trait Scheduler {
    fn schedule(&self, delay_ms: u32, task: Task) -> TaskId;

    /// Cancelling a task that already ran is a no-op
    fn cancel(&self, id: TaskId);
}

/// Coalesces bursts of calls into one run after `wait_ms` of quiet.
/// A pending run is superseded, never executed, when another call arrives.
pub struct Debouncer {
    scheduler: Rc<dyn Scheduler>,
    wait_ms: u32,
    pending: Rc<Cell<Option<TaskId>>>,
}

impl Debouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, wait_ms: u32) -> Self {
        Debouncer {
            scheduler,
            wait_ms,
            pending: Rc::new(Cell::new(None)),
        }
    }

    pub fn call(&self, task: impl FnOnce() + 'static) {
        if let Some(id) = self.pending.take() {
            self.scheduler.cancel(id);
        }

        let pending = Rc::clone(&self.pending);
        let id = self.scheduler.schedule(
            self.wait_ms,
            Box::new(move || {
                pending.set(None);
                task();
            }),
        );
        self.pending.set(Some(id));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.get().is_some()
    }
}

/// Virtual-clock scheduler for deterministic tests
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ManualScheduler {
    now: Cell<u64>,
    next_id: Cell<u64>,
    queue: std::cell::RefCell<std::collections::BTreeMap<(u64, TaskId), Task>>,
}

#[cfg(test)]
impl ManualScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Move the clock forward, running every task that comes due in order,
    /// including tasks scheduled by tasks.
    pub fn advance(&self, ms: u64) {
        let deadline = self.now.get() + ms;
        loop {
            let due = {
                let mut queue = self.queue.borrow_mut();
                match queue.keys().next().copied() {
                    Some(key) if key.0 <= deadline => queue.remove(&key).map(|task| (key.0, task)),
                    _ => None,
                }
            };
            match due {
                Some((at, task)) => {
                    self.now.set(at);
                    task();
                }
                None => break,
            }
        }
        self.now.set(deadline);
    }

    /// Run everything, however far in the future
    pub fn run_all(&self) {
        loop {
            let next = self.queue.borrow().keys().next().map(|key| key.0);
            match next {
                Some(at) => self.advance(at.saturating_sub(self.now.get())),
                None => break,
            }
        }
    }
}

#[cfg(test)]
impl Scheduler for ManualScheduler {
    fn schedule(&self, delay_ms: u32, task: Task) -> TaskId {
        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        let due = self.now.get() + u64::from(delay_ms);
        self.queue.borrow_mut().insert((due, id), task);
        id
    }

    fn cancel(&self, id: TaskId) {
        self.queue.borrow_mut().retain(|key, _| key.1 != id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() -> Box<dyn FnOnce()>) {
        let count = Rc::new(Cell::new(0));
        let make = {
            let count = Rc::clone(&count);
            move || {
                let count = Rc::clone(&count);
                Box::new(move || count.set(count.get() + 1)) as Box<dyn FnOnce()>
            }
        };
        (count, make)
    }

    #[test]
    fn test_manual_scheduler_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let order = Rc::new(std::cell::RefCell::new(Vec::new()));

        for (delay, label) in [(20, "late"), (0, "first"), (10, "middle")] {
            let order = Rc::clone(&order);
            scheduler.schedule(delay, Box::new(move || order.borrow_mut().push(label)));
        }
        scheduler.advance(15);
        assert_eq!(*order.borrow(), vec!["first", "middle"]);

        scheduler.advance(5);
        assert_eq!(*order.borrow(), vec!["first", "middle", "late"]);
    }

    #[test]
    fn test_debounce_coalesces_burst() {
        let scheduler = ManualScheduler::new();
        let debouncer = Debouncer::new(scheduler.clone(), 300);
        let (count, make) = counter();

        for _ in 0..5 {
            debouncer.call(make());
            scheduler.advance(100);
        }
        assert_eq!(count.get(), 0);
        assert!(debouncer.is_pending());

        scheduler.advance(300);
        assert_eq!(count.get(), 1);
        assert!(!debouncer.is_pending());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_debounce_runs_again_after_quiet_period() {
        let scheduler = ManualScheduler::new();
        let debouncer = Debouncer::new(scheduler.clone(), 300);
        let (count, make) = counter();

        debouncer.call(make());
        scheduler.advance(300);
        debouncer.call(make());
        scheduler.advance(299);
        assert_eq!(count.get(), 1);

        scheduler.advance(1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_cancel_after_run_is_noop() {
        let scheduler = ManualScheduler::new();
        let (count, make) = counter();

        let id = scheduler.schedule(0, make());
        scheduler.run_all();
        scheduler.cancel(id);

        assert_eq!(count.get(), 1);
    }
}
