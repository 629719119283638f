use thiserror::Error;

pub type TPResult<T> = Result<T, TPError>;

/// An error returned by the thread pool or by a [`TaskHandle`].
///
/// Errors are cloneable so a handle can give the same cached error to
/// every reader.
///
/// [`TaskHandle`]: crate::TaskHandle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TPError {
    /// The pool was configured with an invalid argument, e.g. zero
    /// workers.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The task could not be submitted because the thread pool is
    /// closed.
    #[error("the thread pool is closed")]
    Closed,

    /// The task panicked while running. Holds the panic message.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// The task returned an error. Holds the rendered error.
    #[error("task failed: {0}")]
    TaskFailed(String),

    /// The result was not ready before the timeout elapsed.
    #[error("timed out waiting for the task result")]
    Timeout,

    /// A handle was used outside its contract inside the pool itself.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// A worker thread could not be spawned.
    #[error("failed to spawn a worker thread: {0}")]
    Spawn(String),
}
