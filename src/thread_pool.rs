use crate::{
    error::TPResult,
    handle::{self, TaskHandle},
    queue::TaskQueue,
    task::{panic_message, Task, TaskFn, TaskListeners},
    worker::Worker,
    TPError, ThreadPoolBuilder,
};

use log::{debug, error, warn};
use parking_lot::Mutex;

use std::{
    convert::Infallible,
    fmt::Display,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread::{self, ThreadId},
};

/// A function that used to create a custom worker thread. It receives
/// the index of the worker.
pub type ThreadFactory = dyn Fn(usize) -> thread::Builder + Send + Sync + 'static;

/// The lifecycle state of a [`ThreadPool`]. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// The pool accepts new tasks.
    Running,

    /// The pool rejects new tasks, but queued and running tasks are
    /// still being executed.
    Draining,

    /// All workers have been joined.
    Stopped,
}

pub(crate) struct ThreadPoolSharedData {
    pub(crate) queue: TaskQueue,
    pub(crate) completed_tasks: AtomicUsize,
    pub(crate) live_workers: AtomicUsize,
    pub(crate) next_task_id: AtomicUsize,
}

/// A `ThreadPool` consists of a fixed number of worker threads and an
/// unbounded FIFO queue that holds submitted tasks.
///
/// # Submitting
///
/// [`submit`] wraps a closure into a task, puts it at the tail of the
/// queue and immediately returns a [`TaskHandle`]. The closure captures
/// its arguments, so any callable can be submitted. Tasks start in the
/// order they were submitted, but may finish in any order because the
/// workers run in parallel.
///
/// # Worker Thread
///
/// Every worker repeatedly takes the head of the queue and runs it. A
/// panic inside a task is caught and stored in the task's handle, so a
/// misbehaving task never takes a worker down.
///
/// # Shutdown
///
/// [`shutdown`] closes the queue: new tasks are rejected with
/// [`TPError::Closed`], but every task already accepted is executed. It
/// returns once all workers have been joined. Dropping the pool does the
/// same.
///
/// When the pool is shared through an `Arc` and the last reference is
/// dropped inside one of its own tasks, the drop runs on a worker thread.
/// A thread cannot join itself, so the queue is closed and the workers
/// are detached instead of joined: they still finish the queued tasks and
/// exit, but nothing waits for them.
///
/// [`submit`]: ThreadPool::submit
/// [`shutdown`]: ThreadPool::shutdown
pub struct ThreadPool {
    pub(crate) share: Arc<ThreadPoolSharedData>,
    pub(crate) workers: Mutex<Vec<Worker>>,
    pub(crate) worker_ids: Vec<ThreadId>,
    pub(crate) task_listeners: Arc<TaskListeners>,
    pub(crate) stopped: AtomicBool,
}

impl ThreadPool {
    /// Creates a thread pool with `num_workers` threads and the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TPError::InvalidArgument`] if `num_workers` is 0.
    ///
    /// # Examples
    ///
    /// ```
    /// use wpool::{TPError, ThreadPool};
    ///
    /// assert!(matches!(ThreadPool::new(0), Err(TPError::InvalidArgument(_))));
    /// assert!(ThreadPool::new(3).is_ok());
    /// ```
    pub fn new(num_workers: usize) -> TPResult<Self> {
        ThreadPoolBuilder::default().num_workers(num_workers).build()
    }

    pub(crate) fn from_builder(builder: ThreadPoolBuilder) -> TPResult<Self> {
        let share = Arc::new(ThreadPoolSharedData {
            queue: TaskQueue::new(),
            completed_tasks: AtomicUsize::new(0),
            live_workers: AtomicUsize::new(0),
            next_task_id: AtomicUsize::new(0),
        });

        let mut workers = Vec::with_capacity(builder.num_workers);
        for index in 0..builder.num_workers {
            let thread = (builder.thread_factory)(index);
            match Worker::spawn(index, thread, &share) {
                Ok(worker) => workers.push(worker),
                Err(err) => {
                    share.queue.close();
                    Self::join_workers(workers.drain(..));
                    return Err(TPError::Spawn(err.to_string()));
                }
            }
        }
        debug!("thread pool started with {} workers", workers.len());

        Ok(Self {
            share,
            worker_ids: workers.iter().map(Worker::thread_id).collect(),
            workers: Mutex::new(workers),
            task_listeners: Arc::new(builder.task_listeners),
            stopped: AtomicBool::new(false),
        })
    }

    /// Submits a task and returns a handle to its result.
    ///
    /// # Errors
    ///
    /// Returns [`TPError::Closed`] if the pool has been shut down. The
    /// task is not queued in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use wpool::ThreadPool;
    ///
    /// let pool = ThreadPool::new(4).unwrap();
    /// let handles: Vec<_> = (1..=10)
    ///     .map(|i| pool.submit(move || i * i).unwrap())
    ///     .collect();
    ///
    /// let sum: i32 = handles.iter().map(|h| *h.get().unwrap()).sum();
    /// assert_eq!(385, sum);
    /// ```
    pub fn submit<F, T>(&self, task_fn: F) -> TPResult<TaskHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        self.try_submit(move || Ok::<T, Infallible>(task_fn()))
    }

    /// Submits a fallible task. An `Err` returned by the task is stored
    /// in the handle as [`TPError::TaskFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`TPError::Closed`] if the pool has been shut down.
    ///
    /// # Examples
    ///
    /// ```
    /// use wpool::{TPError, ThreadPool};
    ///
    /// let pool = ThreadPool::new(1).unwrap();
    /// let handle = pool.try_submit(|| "x".parse::<i32>()).unwrap();
    ///
    /// assert!(matches!(handle.get(), Err(TPError::TaskFailed(_))));
    /// ```
    pub fn try_submit<F, T, E>(&self, task_fn: F) -> TPResult<TaskHandle<T>>
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Display + 'static,
    {
        if self.is_closed() {
            return Err(TPError::Closed);
        }

        let id = self.next_task_id();
        let (promise, handle) = handle::pair(id);
        let job = move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(task_fn)) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => Err(TPError::TaskFailed(err.to_string())),
                Err(payload) => Err(TPError::TaskPanicked(panic_message(&*payload))),
            };
            promise.fulfill(outcome);
        };

        self.share.queue.enqueue(self.create_task(id, Box::new(job)))?;
        Ok(handle)
    }

    /// Executes the given task in the future without tracking its
    /// result. A panic in the task is logged and otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`TPError::Closed`] if the pool has been shut down.
    pub fn execute<F>(&self, task_fn: F) -> TPResult<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_task_id();
        self.share
            .queue
            .enqueue(self.create_task(id, Box::new(task_fn)))
    }

    /// Closes the thread pool and waits for all worker threads to end.
    ///
    /// Tasks that were accepted before the call, queued or running, are
    /// executed before the workers exit. Calling it again, or from
    /// several threads, is fine: every call returns after the workers
    /// have been joined.
    ///
    /// If this is called in a worker thread, the queue is closed but the
    /// workers are not joined.
    ///
    /// # Examples
    ///
    /// ```
    /// use wpool::{PoolState, TPError, ThreadPool};
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    ///
    /// let thread_pool = ThreadPool::new(2).unwrap();
    ///
    /// let sum = Arc::new(AtomicUsize::new(0));
    /// for _ in 0..10 {
    ///     let sum = sum.clone();
    ///     thread_pool.execute(move || {
    ///         sum.fetch_add(1, Ordering::SeqCst);
    ///     }).unwrap();
    /// }
    ///
    /// // Block current thread until all worker threads are finished.
    /// thread_pool.shutdown();
    /// assert_eq!(10, sum.load(Ordering::Relaxed));
    /// assert_eq!(PoolState::Stopped, thread_pool.state());
    /// assert_eq!(Err(TPError::Closed), thread_pool.execute(|| ()));
    /// ```
    pub fn shutdown(&self) {
        if self.share.queue.close() {
            debug!(
                "thread pool is draining, {} tasks queued",
                self.share.queue.len()
            );
        }

        if self.worker_ids.contains(&thread::current().id()) {
            warn!("shutdown called from a worker thread, workers will not be joined");
            return;
        }

        // Concurrent callers wait on this lock until the join is done.
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            Self::join_workers(workers.drain(..));
            self.stopped.store(true, Ordering::SeqCst);
            debug!("thread pool stopped");
        }
    }

    fn join_workers(workers: impl Iterator<Item = Worker>) {
        for worker in workers {
            let index = worker.index;
            if let Err(payload) = worker.join() {
                error!(
                    "worker {index} terminated with a panic: {}",
                    panic_message(&*payload)
                );
            }
        }
    }

    /// Returns `true` if the thread pool no longer accepts tasks.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.share.queue.is_closed()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PoolState {
        if self.stopped.load(Ordering::SeqCst) {
            PoolState::Stopped
        } else if self.is_closed() {
            PoolState::Draining
        } else {
            PoolState::Running
        }
    }

    /// Returns the fixed number of workers of this pool.
    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.worker_ids.len()
    }

    /// Counts all worker threads that are still alive.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.share.live_workers.load(Ordering::SeqCst)
    }

    /// Returns the number of tasks waiting in the queue.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.share.queue.len()
    }

    /// Returns the number of tasks the workers have finished, whether
    /// they succeeded or not.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.share.completed_tasks.load(Ordering::SeqCst)
    }

    fn next_task_id(&self) -> usize {
        self.share.next_task_id.fetch_add(1, Ordering::SeqCst)
    }

    fn create_task(&self, id: usize, task_fn: TaskFn) -> Task {
        Task::create(id, task_fn, self.task_listeners.clone())
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
