//! # Thread Pool
//!
//! A fixed-size thread pool. Submitted closures are queued in FIFO order
//! and run by a set of long-lived worker threads; each submission returns
//! a [`TaskHandle`] that yields the closure's value, or the error it
//! produced, once the task has run.
//!
//! # Build a thread pool
//!
//! [`ThreadPool::new`] creates a pool with the given number of workers.
//! Use the [`ThreadPoolBuilder`] to customize worker threads or to
//! observe task execution.
//!
//! # Examples
//!
//! ```
//! use wpool::ThreadPool;
//!
//! let thread_pool = ThreadPool::new(4).unwrap();
//!
//! let handle = thread_pool.submit(|| 6 * 7).unwrap();
//! assert_eq!(42, *handle.get().unwrap());
//!
//! let failed = thread_pool.submit(|| -> u32 { panic!("boom") }).unwrap();
//! assert!(failed.get().is_err());
//!
//! // Close the thread pool and wait for all worker threads to end.
//! thread_pool.shutdown();
//! ```

mod builder;
mod error;
mod handle;
mod queue;
mod thread_pool;

pub(crate) mod task;
pub(crate) mod worker;

pub use builder::*;
pub use error::{TPError, TPResult};
pub use handle::TaskHandle;
pub use thread_pool::*;
