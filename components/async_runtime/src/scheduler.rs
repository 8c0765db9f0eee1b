//! The deferred-callback contract promises are built on.

use crate::task_queue::MicroTask;
use std::rc::Rc;

/// Runs jobs after the current synchronous execution has finished.
///
/// Implementations must run jobs in the order they were scheduled and must
/// never run a job from inside `schedule` itself.
pub trait Scheduler {
    /// Queues `job` to run on a later turn.
    fn schedule(&self, job: MicroTask);
}

/// A shared handle to a scheduler, as held by every promise.
pub type SharedScheduler = Rc<dyn Scheduler>;
