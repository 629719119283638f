use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;

use crate::{error::TPResult, task::Task, TPError};

/// The FIFO queue shared by submitters and workers.
///
/// Tasks travel through an unbounded channel, so producers never block.
/// The sending side sits behind a mutex: taking it out closes the queue
/// for new tasks while leaving queued ones available to workers. Once the
/// queue is closed and empty, [`dequeue`] returns `None`, which is the
/// signal for workers to exit.
///
/// [`dequeue`]: TaskQueue::dequeue
pub(crate) struct TaskQueue {
    sender: Mutex<Option<Sender<Task>>>,
    receiver: Receiver<Task>,
}

impl TaskQueue {
    pub(crate) fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender: Mutex::new(Some(sender)),
            receiver,
        }
    }

    /// Appends a task to the tail of the queue and wakes one idle worker.
    pub(crate) fn enqueue(&self, task: Task) -> TPResult<()> {
        let sender = self.sender.lock();
        match sender.as_ref() {
            Some(sender) => sender.send(task).map_err(|_| TPError::Closed),
            None => Err(TPError::Closed),
        }
    }

    /// Blocks until a task is available or the queue is closed and
    /// drained.
    pub(crate) fn dequeue(&self) -> Option<Task> {
        self.receiver.recv().ok()
    }

    /// Stops accepting tasks. Returns `true` if this call closed the
    /// queue.
    pub(crate) fn close(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.receiver.len()
    }
}
