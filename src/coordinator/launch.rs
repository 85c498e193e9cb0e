//! The seam between the coordinator and whatever runs its workers.

use crate::error::Result;
use crossbeam_channel::Sender;

/// The contiguous slice of configuration indices given to one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAssignment {
    /// Position of the chunk in the partition.
    pub worker: usize,
    /// Assigned configuration indices, in order.
    pub ids: Vec<usize>,
}

/// Terminal outcome of one worker, sent exactly once per launched worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    /// The worker sent its explicit completion signal.
    Completed { worker: usize },
    /// The worker exited, crashed or errored without completing.
    Failed { worker: usize, reason: String },
}

impl WorkerEvent {
    pub fn worker(&self) -> usize {
        match self {
            Self::Completed { worker } | Self::Failed { worker, .. } => *worker,
        }
    }
}

/// A live worker owned by the coordinator.
///
/// Dropping a handle terminates the worker if it is still running.
pub trait WorkerHandle: Send {
    fn worker(&self) -> usize;

    /// Stop the worker immediately. Its terminal event still arrives.
    fn terminate(&mut self);
}

/// Starts workers for assignments.
pub trait Launcher {
    /// Start a worker for `assignment`; its terminal [`WorkerEvent`] goes to `events`.
    fn launch(
        &mut self,
        assignment: WorkerAssignment,
        events: Sender<WorkerEvent>,
    ) -> Result<Box<dyn WorkerHandle>>;
}
