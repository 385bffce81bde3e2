/// setTimeout-backed scheduler
use crate::scheduler::{Scheduler, Task, TaskId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::Window;

struct Timer {
    handle: Option<i32>,
    _callback: Closure<dyn FnMut()>,
}

pub struct BrowserScheduler {
    window: Window,
    next_id: Cell<u64>,
    timers: RefCell<HashMap<TaskId, Timer>>,
    // A closure cannot be freed while it runs, so fired timers are swept later
    fired: Rc<RefCell<Vec<TaskId>>>,
}

impl BrowserScheduler {
    pub fn new(window: Window) -> Self {
        BrowserScheduler {
            window,
            next_id: Cell::new(0),
            timers: RefCell::new(HashMap::new()),
            fired: Rc::new(RefCell::new(Vec::new())),
        }
    }

    fn sweep(&self) {
        let fired: Vec<TaskId> = self.fired.borrow_mut().drain(..).collect();
        let mut timers = self.timers.borrow_mut();
        for id in fired {
            timers.remove(&id);
        }
    }
}

impl Scheduler for BrowserScheduler {
    fn schedule(&self, delay_ms: u32, task: Task) -> TaskId {
        self.sweep();

        let id = TaskId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let slot = RefCell::new(Some(task));
        let fired = Rc::clone(&self.fired);
        let callback = Closure::<dyn FnMut()>::new(move || {
            let task = slot.borrow_mut().take();
            if let Some(task) = task {
                task();
            }
            fired.borrow_mut().push(id);
        });

        let handle = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                callback.as_ref().unchecked_ref(),
                i32::try_from(delay_ms).unwrap_or(i32::MAX),
            )
            .map_err(|e| log::warn!("setTimeout failed: {:?}", e))
            .ok();

        self.timers.borrow_mut().insert(
            id,
            Timer {
                handle,
                _callback: callback,
            },
        );
        id
    }

    fn cancel(&self, id: TaskId) {
        self.sweep();
        if let Some(timer) = self.timers.borrow_mut().remove(&id) {
            if let Some(handle) = timer.handle {
                self.window.clear_timeout_with_handle(handle);
            }
        }
    }
}
