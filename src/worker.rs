use std::{
    io,
    panic::{self, AssertUnwindSafe},
    sync::{atomic::Ordering, Arc},
    thread::{self, JoinHandle, ThreadId},
};

use log::{debug, error, trace};

use crate::{task::panic_message, thread_pool::ThreadPoolSharedData};

/// A worker holds the handle of one pool thread.
pub(crate) struct Worker {
    pub(crate) index: usize,
    pub(crate) handle: JoinHandle<()>,
}

impl Worker {
    /// Spawns a thread that runs tasks from the shared queue until the
    /// queue is closed and drained.
    pub(crate) fn spawn(
        index: usize,
        builder: thread::Builder,
        share: &Arc<ThreadPoolSharedData>,
    ) -> io::Result<Self> {
        share.live_workers.fetch_add(1, Ordering::SeqCst);
        let spawned = {
            let share = share.clone();
            builder.spawn(move || run(index, &share))
        };
        match spawned {
            Ok(handle) => Ok(Worker { index, handle }),
            Err(err) => {
                share.live_workers.fetch_sub(1, Ordering::SeqCst);
                Err(err)
            }
        }
    }

    #[inline]
    pub(crate) fn thread_id(&self) -> ThreadId {
        self.handle.thread().id()
    }

    /// Joins the thread. Never called from the worker's own thread:
    /// `ThreadPool::shutdown` returns early on pool threads.
    #[inline]
    pub(crate) fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

fn run(index: usize, share: &ThreadPoolSharedData) {
    debug!("worker {index} started");
    while let Some(task) = share.queue.dequeue() {
        let id = task.id();
        trace!("worker {index} runs task {id}");
        // Panics of submitted closures are already stored in their
        // handles; this catches listeners and fire-and-forget tasks.
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| task.run())) {
            error!(
                "worker {index}: task {id} panicked: {}",
                panic_message(&*payload)
            );
        }
        share.completed_tasks.fetch_add(1, Ordering::SeqCst);
    }
    share.live_workers.fetch_sub(1, Ordering::SeqCst);
    debug!("worker {index} exits, the queue is closed and empty");
}
