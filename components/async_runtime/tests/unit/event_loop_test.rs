//! Unit tests for EventLoop

use super::support::*;
use async_runtime::{EventLoop, EventLoopError, MicroTask, Promise, RunStats, Task};
use core_types::{Function, Value};
use std::cell::RefCell;
use std::rc::Rc;

type Log = Rc<RefCell<Vec<String>>>;

fn push(log: &Log, entry: &str) -> impl FnOnce() + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move || log.borrow_mut().push(entry)
}

fn push_task(log: &Log, entry: &str) -> Task {
    let push = push(log, entry);
    Task::new(move || {
        push();
        Ok(())
    })
}

#[test]
fn new_event_loop_has_empty_queues() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
    assert!(event_loop.is_microtask_queue_empty());
    assert_eq!(event_loop.pending_timers(), 0);
    assert!(!event_loop.has_pending_work());
}

#[test]
fn enqueue_task_adds_to_task_queue() {
    let event_loop = EventLoop::new();
    event_loop.enqueue_task(Task::new(|| Ok(())));
    assert!(!event_loop.is_task_queue_empty());
    assert!(event_loop.has_pending_work());
}

#[test]
fn enqueue_microtask_adds_to_microtask_queue() {
    let event_loop = EventLoop::new();
    event_loop.enqueue_microtask(MicroTask::new(|| {}));
    assert!(!event_loop.is_microtask_queue_empty());
}

#[test]
fn task_queue_fifo_order() {
    let event_loop = EventLoop::new();
    let log = Log::default();
    event_loop.enqueue_task(push_task(&log, "task1"));
    event_loop.enqueue_task(push_task(&log, "task2"));

    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["task1", "task2"]);
}

#[test]
fn microtask_queue_fifo_order() {
    let event_loop = EventLoop::new();
    let log = Log::default();
    event_loop.enqueue_microtask(MicroTask::new(push(&log, "micro1")));
    event_loop.enqueue_microtask(MicroTask::new(push(&log, "micro2")));

    assert_eq!(event_loop.run_all_microtasks().unwrap(), 2);
    assert_eq!(*log.borrow(), vec!["micro1", "micro2"]);
}

#[test]
fn microtasks_queued_by_a_task_run_before_the_next_task() {
    let event_loop = EventLoop::new();
    let log = Log::default();

    let el = event_loop.clone();
    let l = log.clone();
    event_loop.enqueue_task(Task::new(move || {
        l.borrow_mut().push("task1".to_string());
        el.enqueue_microtask(MicroTask::new(push(&l, "micro")));
        Ok(())
    }));
    event_loop.enqueue_task(push_task(&log, "task2"));

    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["task1", "micro", "task2"]);
}

#[test]
fn microtasks_queued_by_microtasks_run_in_same_checkpoint() {
    let event_loop = EventLoop::new();
    let log = Log::default();

    let el = event_loop.clone();
    let l = log.clone();
    event_loop.enqueue_microtask(MicroTask::new(move || {
        l.borrow_mut().push("outer".to_string());
        el.enqueue_microtask(MicroTask::new(push(&l, "inner")));
    }));
    event_loop.enqueue_task(push_task(&log, "task"));

    event_loop.process_one_cycle().unwrap();
    assert_eq!(*log.borrow(), vec!["outer", "inner", "task"]);
}

#[test]
fn process_one_cycle_reports_idle_loop() {
    let event_loop = EventLoop::new();
    assert!(!event_loop.process_one_cycle().unwrap());
}

#[test]
fn timers_fire_in_deadline_order() {
    let event_loop = EventLoop::new();
    let log = Log::default();
    event_loop.set_timeout(30, push_task(&log, "30"));
    event_loop.set_timeout(10, push_task(&log, "10"));
    event_loop.set_timeout(20, push_task(&log, "20"));
    assert_eq!(event_loop.pending_timers(), 3);

    let stats = event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["10", "20", "30"]);
    assert_eq!(stats.timers_fired, 3);
    assert_eq!(stats.now, 30);
}

#[test]
fn queued_tasks_run_before_timers() {
    let event_loop = EventLoop::new();
    let log = Log::default();
    event_loop.set_timeout(0, push_task(&log, "timer"));
    event_loop.enqueue_task(push_task(&log, "task"));

    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["task", "timer"]);
}

#[test]
fn nested_timer_delay_is_relative_to_now() {
    let event_loop = EventLoop::new();
    let log = Log::default();

    let el = event_loop.clone();
    let l = log.clone();
    event_loop.set_timeout(
        5,
        Task::new(move || {
            el.set_timeout(5, push_task(&l, "nested"));
            Ok(())
        }),
    );

    let stats = event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["nested"]);
    assert_eq!(stats.now, 10);
}

#[test]
fn cleared_timer_never_fires() {
    let event_loop = EventLoop::new();
    let log = Log::default();
    let id = event_loop.set_timeout(5, push_task(&log, "cleared"));
    assert!(event_loop.clear_timeout(id));
    assert!(!event_loop.clear_timeout(id));

    let stats = event_loop.run_until_done().unwrap();
    assert!(log.borrow().is_empty());
    assert_eq!(stats.timers_fired, 0);
}

#[test]
fn uncaught_task_exception_stops_the_loop() {
    let event_loop = EventLoop::new();
    let log = Log::default();
    event_loop.enqueue_task(Task::new(|| Err(Value::from("boom"))));
    event_loop.enqueue_task(push_task(&log, "after"));

    let err = event_loop.run_until_done().unwrap_err();
    assert!(matches!(err, EventLoopError::UncaughtException(_)));
    assert_eq!(err.to_string(), "uncaught exception: boom");
    assert!(log.borrow().is_empty());

    // The loop can be resumed after the failure.
    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["after"]);
}

#[test]
fn promise_rejection_is_not_an_uncaught_exception() {
    let (event_loop, s) = setup();
    let rejected = Promise::resolve(&s, 1).then(Some(throwing_handler(Value::from("e"))), None);
    assert!(event_loop.run_until_done().is_ok());
    assert!(!rejected.is_pending());
}

#[test]
fn promise_jobs_run_as_microtasks() {
    let (event_loop, s) = setup();
    let log = Log::default();
    event_loop.enqueue_task(push_task(&log, "task"));
    Promise::resolve(&s, 1).then(Some(logging_handler(&log, "handler")), None);

    assert!(!event_loop.is_microtask_queue_empty());
    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["handler", "task"]);
}

#[test]
fn stats_count_completed_work() {
    let event_loop = EventLoop::new();
    let p = fulfill_after(&event_loop, 4, 1);
    p.then(Some(Function::unary(Ok)), None);
    event_loop.enqueue_task(Task::new(|| Ok(())));

    let stats = event_loop.run_until_done().unwrap();
    assert_eq!(
        stats,
        RunStats {
            turns: 2,
            tasks_run: 2,
            timers_fired: 1,
            microtasks_run: 1,
            now: 4,
        }
    );
    assert_eq!(event_loop.stats(), stats);
}

#[test]
fn stats_serialize_as_json() {
    let event_loop = EventLoop::new();
    event_loop.set_timeout(3, Task::new(|| Ok(())));
    let stats = event_loop.run_until_done().unwrap();
    let json = serde_json::to_value(stats).unwrap();
    assert_eq!(json["now"], 3);
    assert_eq!(json["timers_fired"], 1);
}

#[test]
fn loop_logs_through_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let (event_loop, s) = setup();
        let p = Promise::resolve(&s, 1).then(None, None);
        event_loop.run_until_done().unwrap();
        assert_eq!(p.result(), Some(Value::Smi(1)));
    });
}
