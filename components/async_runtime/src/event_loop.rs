//! Event loop implementation.
//!
//! This module provides the event loop that coordinates task, microtask and
//! timer execution, and that serves as the [`Scheduler`] for promises.

use crate::config::EventLoopConfig;
use crate::error::{ConfigError, EventLoopError, LoopResult};
use crate::scheduler::{Scheduler, SharedScheduler};
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue, TimerId, TimerQueue};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Counters describing the work an event loop has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Completed loop turns
    pub turns: u64,
    /// Host tasks run, including fired timers
    pub tasks_run: u64,
    /// Timers fired
    pub timers_fired: u64,
    /// Microtasks run
    pub microtasks_run: u64,
    /// Virtual time in milliseconds
    pub now: u64,
}

#[derive(Debug, Default)]
struct LoopState {
    task_queue: TaskQueue,
    microtask_queue: MicrotaskQueue,
    timers: TimerQueue,
    stats: RunStats,
}

/// The event loop.
///
/// Each turn of the loop:
/// 1. Drains all microtasks queued so far
/// 2. Takes the oldest task from the task queue and executes it, or, when
///    there is none, advances virtual time to the earliest timer and fires it
/// 3. Drains all microtasks again
///
/// `EventLoop` is a cheap handle: clones share the same queues, which is how
/// promises and tasks enqueue more work while the loop is running.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Task};
///
/// let event_loop = EventLoop::new();
///
/// event_loop.enqueue_task(Task::new(|| Ok(())));
/// event_loop.run_until_done().unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventLoop {
    state: Rc<RefCell<LoopState>>,
    config: Rc<EventLoopConfig>,
}

impl EventLoop {
    /// Creates a new EventLoop with empty queues and default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new EventLoop with the given limits.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the config fails validation.
    pub fn with_config(config: EventLoopConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            state: Rc::default(),
            config: Rc::new(config),
        })
    }

    /// Returns the limits this loop runs with.
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Returns a scheduler handle for creating promises on this loop.
    pub fn scheduler(&self) -> SharedScheduler {
        Rc::new(self.clone())
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&self, task: Task) {
        self.state.borrow_mut().task_queue.enqueue(task);
    }

    /// Adds a microtask to the microtask queue.
    ///
    /// The microtask will be executed at the next microtask checkpoint.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        let mut state = self.state.borrow_mut();
        state.microtask_queue.enqueue(microtask);
        trace!(queued = state.microtask_queue.len(), "microtask enqueued");
    }

    /// Schedules a task to run once `delay` virtual milliseconds have passed.
    pub fn set_timeout(&self, delay: u64, task: Task) -> TimerId {
        let mut state = self.state.borrow_mut();
        let deadline = state.stats.now.saturating_add(delay);
        trace!(delay, deadline, "timer set");
        state.timers.insert(deadline, task)
    }

    /// Cancels a pending timer. Returns false if it already fired.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.state.borrow_mut().timers.cancel(id)
    }

    /// Returns the current virtual time in milliseconds.
    pub fn now(&self) -> u64 {
        self.state.borrow().stats.now
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.state.borrow().task_queue.is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.state.borrow().microtask_queue.is_empty()
    }

    /// Returns the number of timers that have not fired yet.
    pub fn pending_timers(&self) -> usize {
        self.state.borrow().timers.len()
    }

    /// Returns true if any task, microtask or timer is waiting.
    pub fn has_pending_work(&self) -> bool {
        let state = self.state.borrow();
        !state.task_queue.is_empty() || !state.microtask_queue.is_empty() || !state.timers.is_empty()
    }

    /// Returns the counters accumulated so far.
    pub fn stats(&self) -> RunStats {
        self.state.borrow().stats
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// New microtasks added during execution are also processed before this
    /// method returns.
    ///
    /// # Returns
    ///
    /// The number of microtasks run.
    ///
    /// # Errors
    ///
    /// `MicrotaskLimitExceeded` if the checkpoint would run more jobs than
    /// the configured limit; the remaining jobs stay queued.
    pub fn run_all_microtasks(&self) -> LoopResult<usize> {
        let limit = self.config.max_microtasks_per_checkpoint;
        let mut ran = 0;
        loop {
            if ran >= limit && !self.is_microtask_queue_empty() {
                warn!(limit, "microtask checkpoint limit reached");
                return Err(EventLoopError::MicrotaskLimitExceeded { limit });
            }
            // The borrow must end before the job runs; jobs enqueue more jobs.
            let next = self.state.borrow_mut().microtask_queue.dequeue();
            let Some(microtask) = next else {
                break;
            };
            microtask.run();
            ran += 1;
            self.state.borrow_mut().stats.microtasks_run += 1;
        }
        Ok(ran)
    }

    /// Processes one complete turn: microtasks, one task or timer, microtasks.
    ///
    /// # Returns
    ///
    /// `true` if any work was done.
    pub fn process_one_cycle(&self) -> LoopResult<bool> {
        let mut did_work = self.run_all_microtasks()? > 0;

        if let Some(task) = self.next_task() {
            did_work = true;
            self.state.borrow_mut().stats.tasks_run += 1;
            if let Err(thrown) = task.run() {
                warn!(%thrown, "uncaught exception in task");
                return Err(EventLoopError::UncaughtException(thrown));
            }
            self.run_all_microtasks()?;
        }

        if did_work {
            self.state.borrow_mut().stats.turns += 1;
        }
        Ok(did_work)
    }

    /// Runs the event loop until all tasks, microtasks and timers are done.
    ///
    /// A promise that never settles does not keep the loop alive: its
    /// continuations are not queued anywhere the loop can see.
    ///
    /// # Errors
    ///
    /// Stops at the first uncaught task exception or exceeded limit.
    pub fn run_until_done(&self) -> LoopResult<RunStats> {
        let mut turns = 0u64;
        while self.has_pending_work() {
            if let Some(limit) = self.config.max_turns {
                if turns >= limit {
                    warn!(limit, "turn limit reached");
                    return Err(EventLoopError::TurnLimitExceeded { limit });
                }
            }
            if self.process_one_cycle()? {
                turns += 1;
            }
        }
        let stats = self.stats();
        debug!(
            turns = stats.turns,
            tasks = stats.tasks_run,
            microtasks = stats.microtasks_run,
            now = stats.now,
            "event loop idle"
        );
        Ok(stats)
    }

    /// Takes the oldest task, or fires the earliest timer if there is none.
    fn next_task(&self) -> Option<Task> {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.task_queue.dequeue() {
            return Some(task);
        }
        let (deadline, task) = state.timers.pop_earliest()?;
        state.stats.now = state.stats.now.max(deadline);
        state.stats.timers_fired += 1;
        trace!(now = state.stats.now, "timer fired");
        Some(task)
    }
}

impl Scheduler for EventLoop {
    fn schedule(&self, job: MicroTask) {
        self.enqueue_microtask(job);
    }
}
