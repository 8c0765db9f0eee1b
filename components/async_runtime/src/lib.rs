//! Promise runtime for JavaScript-style asynchronous values.
//!
//! This crate provides the async runtime components of the engine:
//! - Event loop with task, microtask and timer queues
//! - Promise implementation following the Promise/A+ specification
//! - The resolution procedure that adopts nested and foreign thenables
//! - The `all`, `race`, `allSettled` and `any` combinators
//!
//! # Overview
//!
//! - [`EventLoop`] - Main event loop, and the default [`Scheduler`]
//! - [`Promise`] - Promise/A+ compliant implementation
//! - [`EventLoopConfig`] - Limits for the event loop
//!
//! Everything here is single-threaded. Nothing is installed globally: a
//! host creates an [`EventLoop`] and passes its scheduler to the promises it
//! makes.
//!
//! # Examples
//!
//! ## Event Loop Usage
//!
//! ```
//! use async_runtime::{EventLoop, Task};
//!
//! let event_loop = EventLoop::new();
//! event_loop.enqueue_task(Task::new(|| Ok(())));
//! event_loop.run_until_done().unwrap();
//! ```
//!
//! ## Promise Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise, PromiseState};
//! use core_types::Value;
//!
//! let event_loop = EventLoop::new();
//! let scheduler = event_loop.scheduler();
//!
//! let promise = Promise::new(&scheduler, |resolve, _reject| {
//!     resolve.call(42);
//!     Ok(())
//! });
//! assert!(matches!(promise.state(), PromiseState::Fulfilled));
//! assert_eq!(promise.result(), Some(Value::Smi(42)));
//! ```
//!
//! ## Combinator Usage
//!
//! ```
//! use async_runtime::{EventLoop, Promise};
//! use core_types::Value;
//!
//! let event_loop = EventLoop::new();
//! let s = event_loop.scheduler();
//!
//! let any = Promise::any(&s, vec![Promise::reject(&s, "a").into(), Value::Smi(2)]);
//! event_loop.run_until_done().unwrap();
//! assert_eq!(any.result(), Some(Value::Smi(2)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod combinators;
pub mod config;
pub mod error;
pub mod event_loop;
pub mod promise;
pub mod resolution;
pub mod scheduler;
pub mod task_queue;

// Re-export main types at crate root
pub use combinators::ANY_REJECTED_MESSAGE;
pub use config::EventLoopConfig;
pub use error::{ConfigError, EventLoopError, LoopResult};
pub use event_loop::{EventLoop, RunStats};
pub use promise::{Promise, PromiseState, Reject, Resolve};
pub use resolution::CHAINING_CYCLE_MESSAGE;
pub use scheduler::{Scheduler, SharedScheduler};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue, TimerId, TimerQueue};
