//! Task, microtask and timer queue management.
//!
//! This module provides the queues used by the event loop. Tasks are host
//! work executed one at a time, microtasks are promise jobs that drain
//! completely between tasks, and timers are tasks that become runnable at a
//! virtual deadline.

use core_types::JsResult;
use std::collections::{BTreeMap, VecDeque};

/// A task to be executed by the event loop.
///
/// Tasks represent host work such as timer callbacks or I/O completions.
/// A task may throw; the loop reports the thrown value as an uncaught
/// exception.
pub struct Task {
    callback: Box<dyn FnOnce() -> JsResult<()>>,
}

impl Task {
    /// Creates a new Task from a closure.
    ///
    /// # Arguments
    ///
    /// * `f` - The function to execute when the task runs
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> JsResult<()> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the task.
    ///
    /// # Returns
    ///
    /// `Err` with the thrown value if the task threw.
    pub fn run(self) -> JsResult<()> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// A microtask to be executed by the event loop.
///
/// Microtasks are promise jobs. They never throw: every failure inside a
/// promise job is turned into a rejection before the job returns.
pub struct MicroTask {
    callback: Box<dyn FnOnce()>,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self) {
        (self.callback)()
    }
}

impl std::fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A queue for tasks.
///
/// Tasks are processed in FIFO order, one at a time.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A queue for microtasks.
///
/// Microtasks are drained completely after each task.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<MicroTask>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: MicroTask) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<MicroTask> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// Handle returned by `set_timeout`, used to cancel a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

/// Timers ordered by deadline, FIFO among equal deadlines.
#[derive(Debug, Default)]
pub struct TimerQueue {
    timers: BTreeMap<(u64, u64), Task>,
    next_id: u64,
}

impl TimerQueue {
    /// Creates a new empty TimerQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `task` to become runnable at virtual time `deadline`.
    pub fn insert(&mut self, deadline: u64, task: Task) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.insert((deadline, id), task);
        TimerId(id)
    }

    /// Cancels a timer. Returns false if it already fired or never existed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|&(_, timer), _| timer != id.0);
        self.timers.len() != before
    }

    /// Removes the timer with the earliest deadline.
    pub fn pop_earliest(&mut self) -> Option<(u64, Task)> {
        self.timers
            .pop_first()
            .map(|((deadline, _), task)| (deadline, task))
    }

    /// Returns true if no timer is pending.
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Returns the number of pending timers.
    pub fn len(&self) -> usize {
        self.timers.len()
    }
}
