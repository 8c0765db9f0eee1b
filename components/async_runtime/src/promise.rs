//! Promise implementation following the Promise/A+ specification.
//!
//! This module provides the promise state machine: construction with an
//! executor, settlement through the resolution procedure, and chaining with
//! `then`, `catch` and `finally`. Every handler runs as a job on the
//! promise's [`Scheduler`](crate::Scheduler), never synchronously.

use crate::resolution::resolve_value;
use crate::scheduler::SharedScheduler;
use crate::task_queue::MicroTask;
use core_types::{Function, JsObject, JsResult, Value};
use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// The state of a Promise.
///
/// Promises transition through states according to the Promise/A+ specification.
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// The initial state; the promise is neither fulfilled nor rejected.
    Pending,
    /// The promise has been resolved with a value.
    Fulfilled,
    /// The promise has been rejected with a reason.
    Rejected,
}

/// A continuation waiting for settlement. Receives the settled result.
type Reaction = Box<dyn FnOnce(Value)>;

struct PromiseCell {
    state: PromiseState,
    result: Option<Value>,
    fulfill_reactions: Vec<Reaction>,
    reject_reactions: Vec<Reaction>,
}

pub(crate) struct PromiseInner {
    id: u64,
    this: Weak<PromiseInner>,
    scheduler: SharedScheduler,
    cell: RefCell<PromiseCell>,
}

/// A JavaScript Promise.
///
/// Promises represent the eventual completion (or failure) of an asynchronous
/// operation and its resulting value. `Promise` is a shared handle: clones
/// refer to the same promise.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, PromiseState};
/// use core_types::{Function, Value};
///
/// let event_loop = EventLoop::new();
/// let scheduler = event_loop.scheduler();
///
/// let promise = Promise::resolve(&scheduler, 41);
/// let next = promise.then(
///     Some(Function::unary(|v| match v {
///         Value::Smi(n) => Ok(Value::Smi(n + 1)),
///         other => Ok(other),
///     })),
///     None,
/// );
/// assert_eq!(next.state(), PromiseState::Pending);
///
/// event_loop.run_until_done().unwrap();
/// assert_eq!(next.result(), Some(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<PromiseInner>,
}

/// The capability that fulfills (or adopts into) its promise.
#[derive(Clone)]
pub struct Resolve {
    promise: Promise,
}

/// The capability that rejects its promise.
#[derive(Clone)]
pub struct Reject {
    promise: Promise,
}

impl Resolve {
    /// Resolves the promise with `value`, adopting it if it is a thenable.
    ///
    /// A no-op once the promise has settled.
    pub fn call(&self, value: impl Into<Value>) {
        self.promise.settle_fulfilled(value.into());
    }

    /// Wraps this capability as a callable value.
    pub fn into_function(self) -> Function {
        Function::named("resolve", move |args| {
            self.call(first_argument(args));
            Ok(Value::Undefined)
        })
    }
}

impl Reject {
    /// Rejects the promise with `reason`.
    ///
    /// A no-op once the promise has settled.
    pub fn call(&self, reason: impl Into<Value>) {
        self.promise.settle_rejected(reason.into());
    }

    /// Wraps this capability as a callable value.
    pub fn into_function(self) -> Function {
        Function::named("reject", move |args| {
            self.call(first_argument(args));
            Ok(Value::Undefined)
        })
    }
}

impl Promise {
    /// Creates a new Promise and runs `executor` synchronously.
    ///
    /// The executor receives the promise's resolve and reject capabilities.
    /// If it throws, the thrown value rejects the promise.
    ///
    /// # Arguments
    ///
    /// * `scheduler` - Where this promise and its chains run their jobs
    /// * `executor` - Initializer that eventually settles the promise
    pub fn new<F>(scheduler: &SharedScheduler, executor: F) -> Promise
    where
        F: FnOnce(Resolve, Reject) -> JsResult<()>,
    {
        let promise = Promise::pending(scheduler);
        let resolve = Resolve {
            promise: promise.clone(),
        };
        let reject = Reject {
            promise: promise.clone(),
        };
        if let Err(thrown) = executor(resolve, reject) {
            trace!(promise = promise.id(), %thrown, "executor threw");
            promise.settle_rejected(thrown);
        }
        promise
    }

    /// Creates a promise resolved with `value`.
    ///
    /// A thenable `value` is adopted, so the result may still be pending.
    pub fn resolve(scheduler: &SharedScheduler, value: impl Into<Value>) -> Promise {
        let value = value.into();
        Promise::new(scheduler, move |resolve, _| {
            resolve.call(value);
            Ok(())
        })
    }

    /// Creates a promise already rejected with `reason`.
    pub fn reject(scheduler: &SharedScheduler, reason: impl Into<Value>) -> Promise {
        let reason = reason.into();
        Promise::new(scheduler, move |_, reject| {
            reject.call(reason);
            Ok(())
        })
    }

    pub(crate) fn pending(scheduler: &SharedScheduler) -> Promise {
        let id = NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed);
        let inner = Rc::new_cyclic(|this| PromiseInner {
            id,
            this: this.clone(),
            scheduler: scheduler.clone(),
            cell: RefCell::new(PromiseCell {
                state: PromiseState::Pending,
                result: None,
                fulfill_reactions: Vec::new(),
                reject_reactions: Vec::new(),
            }),
        });
        trace!(promise = id, "promise created");
        Promise { inner }
    }

    /// Returns the process-unique id of this promise.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Returns the current state.
    pub fn state(&self) -> PromiseState {
        self.inner.cell.borrow().state
    }

    /// Returns true while the promise has not settled.
    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    /// Returns the fulfillment value or rejection reason, once settled.
    pub fn result(&self) -> Option<Value> {
        self.inner.cell.borrow().result.clone()
    }

    /// Returns the scheduler this promise runs its jobs on.
    pub fn scheduler(&self) -> &SharedScheduler {
        &self.inner.scheduler
    }

    /// Returns the promise behind `value`, if it is one of ours.
    pub fn from_value(value: &Value) -> Option<Promise> {
        let object = value.as_object()?.clone();
        object
            .into_any()
            .downcast::<PromiseInner>()
            .ok()
            .map(|inner| Promise { inner })
    }

    /// Returns true if `value` is this very promise.
    pub fn is_same_object(&self, value: &Value) -> bool {
        value
            .as_object()
            .map(|object| Rc::as_ptr(object) as *const () == Rc::as_ptr(&self.inner) as *const ())
            .unwrap_or(false)
    }

    /// Returns the number of continuations waiting for settlement.
    pub fn pending_reactions(&self) -> usize {
        let cell = self.inner.cell.borrow();
        cell.fulfill_reactions.len()
    }

    /// Adds handlers for fulfillment and/or rejection.
    ///
    /// Returns a new Promise that will be resolved with whatever the
    /// relevant handler returns, or rejected with whatever it throws. A
    /// missing fulfillment handler passes the value through; a missing
    /// rejection handler passes the reason through.
    ///
    /// Handlers always run on a later job, even if this promise has already
    /// settled.
    ///
    /// # Arguments
    ///
    /// * `on_fulfilled` - Optional handler called when Promise fulfills
    /// * `on_rejected` - Optional handler called when Promise rejects
    pub fn then(&self, on_fulfilled: Option<Function>, on_rejected: Option<Function>) -> Promise {
        let next = Promise::pending(&self.inner.scheduler);
        let fulfill_job = reaction_job(next.clone(), on_fulfilled, PromiseState::Fulfilled);
        let reject_job = reaction_job(next.clone(), on_rejected, PromiseState::Rejected);

        let mut cell = self.inner.cell.borrow_mut();
        match cell.state {
            PromiseState::Pending => {
                let scheduler = self.inner.scheduler.clone();
                cell.fulfill_reactions.push(Box::new(move |value| {
                    scheduler.schedule(MicroTask::new(move || fulfill_job(value)));
                }));
                let scheduler = self.inner.scheduler.clone();
                cell.reject_reactions.push(Box::new(move |reason| {
                    scheduler.schedule(MicroTask::new(move || reject_job(reason)));
                }));
                trace!(promise = self.id(), next = next.id(), "reaction registered");
            }
            PromiseState::Fulfilled => {
                let value = cell.result.clone().unwrap_or(Value::Undefined);
                drop(cell);
                self.inner
                    .scheduler
                    .schedule(MicroTask::new(move || fulfill_job(value)));
            }
            PromiseState::Rejected => {
                let reason = cell.result.clone().unwrap_or(Value::Undefined);
                drop(cell);
                self.inner
                    .scheduler
                    .schedule(MicroTask::new(move || reject_job(reason)));
            }
        }
        next
    }

    /// Adds a rejection handler. Same as `then(None, on_rejected)`.
    pub fn catch(&self, on_rejected: Option<Function>) -> Promise {
        self.then(None, on_rejected)
    }

    /// Adds a handler that runs on either outcome.
    ///
    /// Same as `then(on_settled, on_settled)`: the handler receives the value
    /// or the reason, and what it returns settles the next promise.
    pub fn finally(&self, on_settled: Option<Function>) -> Promise {
        self.then(on_settled.clone(), on_settled)
    }

    /// Runs the resolution procedure with this promise as the anchor.
    pub(crate) fn settle_fulfilled(&self, value: Value) {
        if !self.is_pending() {
            trace!(promise = self.id(), "resolve after settlement ignored");
            return;
        }
        let fulfill = self.clone();
        let reject = self.clone();
        resolve_value(
            value,
            self,
            Rc::new(move |value: Value| fulfill.commit(PromiseState::Fulfilled, value)),
            Rc::new(move |reason: Value| reject.settle_rejected(reason)),
        );
    }

    pub(crate) fn settle_rejected(&self, reason: Value) {
        self.commit(PromiseState::Rejected, reason);
    }

    /// Moves out of Pending and runs the matching continuations.
    fn commit(&self, state: PromiseState, result: Value) {
        let reactions = {
            let mut cell = self.inner.cell.borrow_mut();
            if cell.state != PromiseState::Pending {
                return;
            }
            cell.state = state;
            cell.result = Some(result.clone());
            let fulfilled = std::mem::take(&mut cell.fulfill_reactions);
            let rejected = std::mem::take(&mut cell.reject_reactions);
            if state == PromiseState::Fulfilled {
                fulfilled
            } else {
                rejected
            }
        };
        trace!(
            promise = self.id(),
            ?state,
            reactions = reactions.len(),
            "promise settled"
        );
        for reaction in reactions {
            reaction(result.clone());
        }
    }
}

/// Builds the job that runs one handler and settles `next` with its outcome.
fn reaction_job(
    next: Promise,
    handler: Option<Function>,
    outcome: PromiseState,
) -> impl FnOnce(Value) + 'static {
    move |argument| {
        let completion = match handler {
            Some(handler) => handler.call(&[argument]),
            None if outcome == PromiseState::Fulfilled => Ok(argument),
            None => Err(argument),
        };
        match completion {
            Ok(value) => next.settle_fulfilled(value),
            Err(reason) => next.settle_rejected(reason),
        }
    }
}

fn first_argument(args: &[Value]) -> Value {
    args.first().cloned().unwrap_or(Value::Undefined)
}

/// Non-callable handler arguments count as missing.
fn handler_argument(args: &[Value], index: usize) -> Option<Function> {
    args.get(index).and_then(Value::as_function).cloned()
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::Object(promise.inner)
    }
}

impl JsObject for PromiseInner {
    fn get(&self, key: &str) -> JsResult<Value> {
        let Some(inner) = self.this.upgrade() else {
            return Ok(Value::Undefined);
        };
        let promise = Promise { inner };
        let method = match key {
            "then" => Function::named("then", move |args| {
                let next = promise.then(handler_argument(args, 0), handler_argument(args, 1));
                Ok(next.into())
            }),
            "catch" => Function::named("catch", move |args| {
                Ok(promise.catch(handler_argument(args, 0)).into())
            }),
            "finally" => Function::named("finally", move |args| {
                Ok(promise.finally(handler_argument(args, 0)).into())
            }),
            _ => return Ok(Value::Undefined),
        };
        Ok(method.into())
    }

    fn class_name(&self) -> &str {
        "Promise"
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}
