use std::{any::Any, sync::Arc};

pub type TaskFn = Box<dyn FnOnce() + Send + 'static>;

pub(crate) type Listener = Box<dyn Fn(usize) + Send + Sync>;

pub(crate) struct TaskListeners {
    pub(crate) before_execute: Listener,
    pub(crate) after_execute: Listener,
}

impl Default for TaskListeners {
    fn default() -> Self {
        Self {
            before_execute: Box::new(|_| {}),
            after_execute: Box::new(|_| {}),
        }
    }
}

/// A unit of work waiting in the queue. The closure has already
/// captured everything it needs, including the promise of its handle.
pub struct Task {
    id: usize,
    task_fn: TaskFn,
    listeners: Arc<TaskListeners>,
}

impl Task {
    pub(crate) fn create(id: usize, task_fn: TaskFn, listeners: Arc<TaskListeners>) -> Self {
        Self {
            id,
            task_fn,
            listeners,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn run(self) {
        let listeners = self.listeners;
        (listeners.before_execute)(self.id);
        (self.task_fn)();
        (listeners.after_execute)(self.id);
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
