use std::{
    sync::OnceLock,
    time::{Duration, Instant},
};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use log::trace;
use parking_lot::Mutex;

use crate::{error::TPResult, TPError};

type Outcome<T> = TPResult<T>;

/// Creates a connected promise and handle for the task `id`.
pub(crate) fn pair<T>(id: usize) -> (Promise<T>, TaskHandle<T>) {
    let (sender, receiver) = bounded(1);
    (
        Promise { id, sender },
        TaskHandle {
            id,
            receiver: Mutex::new(receiver),
            outcome: OnceLock::new(),
        },
    )
}

/// The write side of a [`TaskHandle`]. Fulfilling consumes the promise,
/// so a task outcome is delivered at most once.
pub(crate) struct Promise<T> {
    id: usize,
    sender: Sender<Outcome<T>>,
}

impl<T> Promise<T> {
    pub(crate) fn fulfill(self, outcome: Outcome<T>) {
        if self.sender.send(outcome).is_err() {
            trace!("the handle of task {} was dropped, discarding its result", self.id);
        }
    }
}

/// A handle to the eventual result of a submitted task.
///
/// The first successful read receives the outcome from the worker and
/// caches it; every later read, from any thread, sees the same value or
/// the same error.
///
/// # Examples
///
/// ```
/// use wpool::ThreadPool;
///
/// let pool = ThreadPool::new(2).unwrap();
/// let handle = pool.submit(|| "hello".to_uppercase()).unwrap();
///
/// assert_eq!("HELLO", handle.get().unwrap());
/// // Reads are cached.
/// assert_eq!("HELLO", handle.get().unwrap());
/// ```
pub struct TaskHandle<T> {
    id: usize,
    receiver: Mutex<Receiver<Outcome<T>>>,
    outcome: OnceLock<Outcome<T>>,
}

impl<T> TaskHandle<T> {
    /// Returns the id the pool assigned to the task.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Blocks until the task has finished and returns its result.
    ///
    /// # Errors
    ///
    /// 1. [`TaskPanicked`] or [`TaskFailed`]: the task failed. The same
    ///    error is returned on every call.
    ///
    /// 2. [`InvalidState`]: the task was dropped without producing a result.
    ///
    /// [`TaskPanicked`]: crate::TPError::TaskPanicked
    /// [`TaskFailed`]: crate::TPError::TaskFailed
    /// [`InvalidState`]: crate::TPError::InvalidState
    pub fn get(&self) -> TPResult<&T> {
        Self::as_result(self.resolve(None)?)
    }

    /// Like [`get`], but gives up with [`TPError::Timeout`] if the task has
    /// not finished within `timeout`. A timed out read does not affect the
    /// task; the result can still be read later.
    ///
    /// [`get`]: TaskHandle::get
    pub fn get_timeout(&self, timeout: Duration) -> TPResult<&T> {
        // An overflowing deadline means waiting without limit.
        let deadline = Instant::now().checked_add(timeout);
        Self::as_result(self.resolve(deadline)?)
    }

    /// Returns `true` if the result is available without blocking.
    pub fn is_finished(&self) -> bool {
        if self.outcome.get().is_some() {
            return true;
        }
        // A locked receiver means another reader is about to cache it.
        self.receiver
            .try_lock()
            .is_some_and(|receiver| !receiver.is_empty())
    }

    /// Blocks until the task has finished and returns the owned result.
    pub fn into_result(self) -> TPResult<T> {
        if let Some(outcome) = self.outcome.into_inner() {
            return outcome;
        }
        self.receiver
            .into_inner()
            .recv()
            .unwrap_or(Err(Self::abandoned()))
    }

    fn resolve(&self, deadline: Option<Instant>) -> TPResult<&Outcome<T>> {
        if let Some(outcome) = self.outcome.get() {
            return Ok(outcome);
        }

        let receiver = match deadline {
            Some(deadline) => self
                .receiver
                .try_lock_until(deadline)
                .ok_or(TPError::Timeout)?,
            None => self.receiver.lock(),
        };

        // Another reader may have cached the outcome while we waited for
        // the lock.
        if let Some(outcome) = self.outcome.get() {
            return Ok(outcome);
        }

        let received = match deadline {
            Some(deadline) => match receiver.recv_deadline(deadline) {
                Ok(outcome) => outcome,
                Err(RecvTimeoutError::Timeout) => return Err(TPError::Timeout),
                Err(RecvTimeoutError::Disconnected) => Err(Self::abandoned()),
            },
            None => receiver.recv().unwrap_or(Err(Self::abandoned())),
        };
        Ok(self.outcome.get_or_init(|| received))
    }

    fn as_result(outcome: &Outcome<T>) -> TPResult<&T> {
        outcome.as_ref().map_err(Clone::clone)
    }

    fn abandoned() -> TPError {
        TPError::InvalidState("the task was dropped before producing a result")
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::pair;
    use crate::TPError;
    use std::{
        sync::{Arc, Barrier},
        thread,
        time::Duration,
    };

    #[test]
    fn test_get_is_idempotent() {
        let (promise, handle) = pair(3);
        assert!(!handle.is_finished());
        promise.fulfill(Ok(String::from("value")));

        assert!(handle.is_finished());
        assert_eq!("value", handle.get().unwrap());
        assert_eq!("value", handle.get().unwrap());
        assert_eq!(3, handle.id());
    }

    #[test]
    fn test_error_is_cached() {
        let (promise, handle) = pair::<i32>(0);
        promise.fulfill(Err(TPError::TaskPanicked("boom".into())));

        assert_eq!(Err(TPError::TaskPanicked("boom".into())), handle.get());
        assert_eq!(Err(TPError::TaskPanicked("boom".into())), handle.get());
    }

    #[test]
    fn test_dropped_promise() {
        let (promise, handle) = pair::<i32>(0);
        drop(promise);

        assert!(matches!(handle.get(), Err(TPError::InvalidState(_))));
        assert!(matches!(
            handle.get_timeout(Duration::from_millis(1)),
            Err(TPError::InvalidState(_))
        ));
    }

    #[test]
    fn test_timeout_does_not_disturb_fulfillment() {
        let (promise, handle) = pair::<i32>(0);
        assert_eq!(
            Err(TPError::Timeout),
            handle.get_timeout(Duration::from_millis(10))
        );

        promise.fulfill(Ok(5));
        assert_eq!(Ok(&5), handle.get_timeout(Duration::from_millis(10)));
        assert_eq!(Ok(&5), handle.get());
    }

    #[test]
    fn test_concurrent_readers_share_outcome() {
        let (promise, handle) = pair::<u64>(0);
        let handle = Arc::new(handle);
        let barrier = Arc::new(Barrier::new(5));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let handle = handle.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    *handle.get().unwrap()
                })
            })
            .collect();

        barrier.wait();
        thread::sleep(Duration::from_millis(10));
        promise.fulfill(Ok(99_u64));

        for reader in readers {
            assert_eq!(99, reader.join().unwrap());
        }
    }

    #[test]
    fn test_into_result() {
        let (promise, handle) = pair(0);
        promise.fulfill(Ok(vec![1, 2, 3]));
        assert_eq!(Ok(vec![1, 2, 3]), handle.into_result());

        let (promise, handle) = pair(0);
        promise.fulfill(Ok(vec![4]));
        assert_eq!(&vec![4], handle.get().unwrap());
        assert_eq!(Ok(vec![4]), handle.into_result());

        let (promise, handle) = pair::<()>(0);
        drop(promise);
        assert!(matches!(handle.into_result(), Err(TPError::InvalidState(_))));
    }

    #[test]
    fn test_dropped_handle() {
        let (promise, handle) = pair(0);
        drop(handle);
        promise.fulfill(Ok(1));
    }
}
