use std::thread;

use crate::{error::TPResult, task::TaskListeners, TPError, ThreadFactory, ThreadPool};

/// A builder of the [`ThreadPool`], which can be used to configure
/// the properties of a new thread pool.
///
/// # Examples
///
/// ```
/// use wpool::ThreadPoolBuilder;
///
/// let thread_pool = ThreadPoolBuilder::default()
///     .num_workers(4)
///     .listener_before_execute(|id| println!("the task {} will be executed.", id))
///     .listener_after_execute(|id| println!("the task {} has been executed.", id))
///     .thread_factory_fn(|index| {
///         std::thread::Builder::new()
///             .name(format!("io-{index}"))
///             .stack_size(1024 * 64)
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(4, thread_pool.num_workers());
/// ```
pub struct ThreadPoolBuilder {
    pub(crate) num_workers: usize,
    pub(crate) task_listeners: TaskListeners,
    pub(crate) thread_factory: Box<ThreadFactory>,
}

impl Default for ThreadPoolBuilder {
    /// Creates a new builder with the default configuration.
    ///
    /// # Default Configuration
    /// - `num_workers`: the number of logical cores of the current system
    /// - `before_execute`: an empty closure `|_| ()`
    /// - `after_execute`: an empty closure `|_| ()`
    /// - `thread_factory`: threads named `wpool-worker-{index}`
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            task_listeners: TaskListeners::default(),
            thread_factory: Box::new(|index| {
                thread::Builder::new().name(format!("wpool-worker-{index}"))
            }),
        }
    }
}

impl ThreadPoolBuilder {
    /// Creates the base configuration for the new thread pool.
    ///
    /// See: [`ThreadPoolBuilder::default`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fixed number of worker threads.
    #[must_use]
    pub fn num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    /// Sets the listener function that will be invoked on the worker
    /// thread before a task is executed.
    #[must_use]
    pub fn listener_before_execute<F>(mut self, listener: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.task_listeners.before_execute = Box::new(listener);
        self
    }

    /// Sets the listener function that will be invoked on the worker
    /// thread after a task is executed.
    #[must_use]
    pub fn listener_after_execute<F>(mut self, listener: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.task_listeners.after_execute = Box::new(listener);
        self
    }

    /// Sets the factory function that is used to create each worker
    /// thread. It receives the index of the worker.
    #[must_use]
    pub fn thread_factory_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) -> thread::Builder + Send + Sync + 'static,
    {
        self.thread_factory = Box::new(f);
        self
    }

    /// Creates a thread pool and starts all of its workers.
    ///
    /// # Errors
    ///
    /// 1. [`InvalidArgument`]: the number of workers is 0.
    ///
    /// 2. [`Spawn`]: a worker thread could not be created.
    ///
    /// [`InvalidArgument`]: crate::TPError::InvalidArgument
    /// [`Spawn`]: crate::TPError::Spawn
    pub fn build(self) -> TPResult<ThreadPool> {
        self.check_arguments()?;
        ThreadPool::from_builder(self)
    }

    fn check_arguments(&self) -> TPResult<()> {
        if self.num_workers == 0 {
            return Err(TPError::InvalidArgument("num_workers can not be 0"));
        }
        Ok(())
    }
}
