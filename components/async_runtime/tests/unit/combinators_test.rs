//! Unit tests for all, race, allSettled and any

use super::support::*;
use async_runtime::{Promise, PromiseState, ANY_REJECTED_MESSAGE};
use core_types::{ErrorKind, JsError, JsObject, JsResult, Value};
use std::any::Any;
use std::rc::Rc;

fn smis(values: &[i32]) -> Value {
    Value::array(values.iter().copied().map(Value::Smi).collect())
}

/// An object whose iteration throws.
struct FailingIterable;

impl JsObject for FailingIterable {
    fn get(&self, _key: &str) -> JsResult<Value> {
        Ok(Value::Undefined)
    }

    fn iterate(&self) -> Option<JsResult<Vec<Value>>> {
        Some(Err(JsError::type_error("iteration failed").into()))
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

fn failing_iterable() -> Value {
    Value::Object(Rc::new(FailingIterable))
}

mod all {
    use super::*;

    #[test]
    fn empty_input_fulfills_with_empty_array() {
        let (el, s) = setup();
        let all = Promise::all(&s, Vec::<Value>::new());
        el.run_until_done().unwrap();
        assert_eq!(all.result(), Some(Value::array(vec![])));
    }

    #[test]
    fn preserves_input_order_regardless_of_settle_order() {
        let (el, s) = setup();
        let all = Promise::all(
            &s,
            vec![
                fulfill_after(&el, 30, 1).into(),
                fulfill_after(&el, 10, 2).into(),
                fulfill_after(&el, 20, 3).into(),
            ],
        );
        el.run_until_done().unwrap();
        assert_eq!(all.result(), Some(smis(&[1, 2, 3])));
    }

    #[test]
    fn non_promise_items_count_as_fulfilled() {
        let (el, s) = setup();
        let all = Promise::all(
            &s,
            vec![Value::Smi(1), Promise::resolve(&s, 2).into(), Value::Smi(3)],
        );
        el.run_until_done().unwrap();
        assert_eq!(all.result(), Some(smis(&[1, 2, 3])));
    }

    #[test]
    fn only_non_promise_items_fulfill_synchronously() {
        let (_el, s) = setup();
        let all = Promise::all(&s, vec![Value::Smi(1), Value::Smi(2)]);
        assert_eq!(all.result(), Some(smis(&[1, 2])));
    }

    #[test]
    fn first_rejection_wins() {
        let (el, s) = setup();
        let all = Promise::all(
            &s,
            vec![
                fulfill_after(&el, 1, 1).into(),
                reject_after(&el, 20, "slow").into(),
                reject_after(&el, 10, "fast").into(),
            ],
        );
        el.run_until_done().unwrap();
        assert_eq!(all.state(), PromiseState::Rejected);
        assert_eq!(all.result(), Some(Value::from("fast")));
    }

    #[test]
    fn rejects_without_waiting_for_pending_inputs() {
        let (el, s) = setup();
        let never = Promise::new(&s, |_, _| Ok(()));
        let all = Promise::all(&s, vec![never.into(), Promise::reject(&s, "e").into()]);
        el.run_until_done().unwrap();
        assert_eq!(all.result(), Some(Value::from("e")));
    }

    #[test]
    fn iteration_error_rejects() {
        let (el, s) = setup();
        let all = Promise::all(&s, failing_iterable());
        el.run_until_done().unwrap();
        assert_eq!(all.state(), PromiseState::Rejected);
        assert_eq!(error_message(&all.result().unwrap()), "iteration failed");
    }

    #[test]
    fn non_iterable_rejects_with_type_error() {
        let (_el, s) = setup();
        let all = Promise::all(&s, Value::Smi(5));
        assert_eq!(as_error(&all.result().unwrap()).kind, ErrorKind::TypeError);
    }

    #[test]
    fn string_input_iterates_characters() {
        let (_el, s) = setup();
        let all = Promise::all(&s, "ab");
        assert_eq!(
            all.result(),
            Some(Value::array(vec![Value::from("a"), Value::from("b")]))
        );
    }
}

mod race {
    use super::*;

    #[test]
    fn empty_input_never_settles() {
        let (el, s) = setup();
        let race = Promise::race(&s, Vec::<Value>::new());
        el.run_until_done().unwrap();
        assert!(race.is_pending());
    }

    #[test]
    fn fastest_input_wins() {
        let (el, s) = setup();
        let race = Promise::race(
            &s,
            vec![
                fulfill_after(&el, 10, "slow").into(),
                fulfill_after(&el, 1, "fast").into(),
            ],
        );
        el.run_until_done().unwrap();
        assert_eq!(race.result(), Some(Value::from("fast")));
    }

    #[test]
    fn fastest_rejection_wins() {
        let (el, s) = setup();
        let race = Promise::race(
            &s,
            vec![
                fulfill_after(&el, 10, "slow").into(),
                reject_after(&el, 5, "failed").into(),
            ],
        );
        el.run_until_done().unwrap();
        assert_eq!(race.state(), PromiseState::Rejected);
        assert_eq!(race.result(), Some(Value::from("failed")));
    }

    #[test]
    fn already_settled_inputs_win_in_input_order() {
        let (el, s) = setup();
        let race = Promise::race(
            &s,
            vec![Promise::reject(&s, "first").into(), Promise::resolve(&s, 2).into()],
        );
        el.run_until_done().unwrap();
        assert_eq!(race.result(), Some(Value::from("first")));
    }

    #[test]
    fn non_promise_item_settles_race() {
        let (el, s) = setup();
        let race = Promise::race(&s, vec![fulfill_after(&el, 1, "timer").into(), Value::Smi(7)]);
        el.run_until_done().unwrap();
        assert_eq!(race.result(), Some(Value::Smi(7)));
    }

    #[test]
    fn iteration_error_rejects() {
        let (el, s) = setup();
        let race = Promise::race(&s, failing_iterable());
        el.run_until_done().unwrap();
        assert_eq!(race.state(), PromiseState::Rejected);
    }
}

mod all_settled {
    use super::*;

    #[test]
    fn empty_input_fulfills_with_empty_array() {
        let (el, s) = setup();
        let settled = Promise::all_settled(&s, Vec::<Value>::new());
        el.run_until_done().unwrap();
        assert_eq!(settled.result(), Some(Value::array(vec![])));
    }

    #[test]
    fn records_every_outcome_in_input_order() {
        let (el, s) = setup();
        let settled = Promise::all_settled(
            &s,
            vec![
                reject_after(&el, 10, "bad").into(),
                fulfill_after(&el, 5, 1).into(),
                Value::Smi(2),
            ],
        );
        el.run_until_done().unwrap();
        assert_eq!(settled.state(), PromiseState::Fulfilled);

        let result = settled.result().unwrap();
        let records = result.as_array().unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].get("status"), Ok(Value::from("rejected")));
        assert_eq!(records[0].get("reason"), Ok(Value::from("bad")));
        assert_eq!(records[1].get("status"), Ok(Value::from("fulfilled")));
        assert_eq!(records[1].get("value"), Ok(Value::Smi(1)));
        assert_eq!(records[2].get("status"), Ok(Value::from("fulfilled")));
        assert_eq!(records[2].get("value"), Ok(Value::Smi(2)));
    }

    #[test]
    fn never_rejects_when_every_input_rejects() {
        let (el, s) = setup();
        let settled = Promise::all_settled(
            &s,
            vec![Promise::reject(&s, 1).into(), Promise::reject(&s, 2).into()],
        );
        el.run_until_done().unwrap();
        assert_eq!(settled.state(), PromiseState::Fulfilled);
    }

    #[test]
    fn iteration_error_rejects() {
        let (el, s) = setup();
        let settled = Promise::all_settled(&s, failing_iterable());
        el.run_until_done().unwrap();
        assert_eq!(settled.state(), PromiseState::Rejected);
    }
}

mod any {
    use super::*;

    #[test]
    fn empty_input_rejects_with_aggregate_error() {
        let (_el, s) = setup();
        let any = Promise::any(&s, Vec::<Value>::new());
        let error = as_error(&any.result().unwrap());
        assert_eq!(error.kind, ErrorKind::AggregateError);
        assert_eq!(error.message, ANY_REJECTED_MESSAGE);
        assert!(error.errors.is_empty());
    }

    #[test]
    fn first_fulfillment_wins() {
        let (el, s) = setup();
        let any = Promise::any(
            &s,
            vec![
                reject_after(&el, 1, "e").into(),
                fulfill_after(&el, 20, "slow").into(),
                fulfill_after(&el, 10, "fast").into(),
            ],
        );
        el.run_until_done().unwrap();
        assert_eq!(any.result(), Some(Value::from("fast")));
    }

    #[test]
    fn rejects_only_after_every_input_rejects() {
        let (el, s) = setup();
        let any = Promise::any(
            &s,
            vec![
                reject_after(&el, 10, "e1").into(),
                reject_after(&el, 20, "e2").into(),
            ],
        );

        while el.now() < 10 {
            el.process_one_cycle().unwrap();
        }
        assert!(any.is_pending());

        el.run_until_done().unwrap();
        assert_eq!(el.now(), 20);
        let error = as_error(&any.result().unwrap());
        assert_eq!(error.kind, ErrorKind::AggregateError);
        assert_eq!(error.message, ANY_REJECTED_MESSAGE);
        assert_eq!(error.errors, vec![Value::from("e1"), Value::from("e2")]);
    }

    #[test]
    fn aggregate_errors_follow_input_order() {
        let (el, s) = setup();
        let any = Promise::any(
            &s,
            vec![
                reject_after(&el, 20, "late").into(),
                reject_after(&el, 10, "early").into(),
            ],
        );
        el.run_until_done().unwrap();
        let errors = any.result().unwrap().get("errors").unwrap();
        assert_eq!(
            errors,
            Value::array(vec![Value::from("late"), Value::from("early")])
        );
    }

    #[test]
    fn non_promise_item_fulfills() {
        let (el, s) = setup();
        let any = Promise::any(&s, vec![Promise::reject(&s, "e").into(), Value::from("plain")]);
        el.run_until_done().unwrap();
        assert_eq!(any.result(), Some(Value::from("plain")));
    }

    #[test]
    fn iteration_error_rejects_with_thrown_value() {
        let (el, s) = setup();
        let any = Promise::any(&s, failing_iterable());
        el.run_until_done().unwrap();
        assert_eq!(as_error(&any.result().unwrap()).kind, ErrorKind::TypeError);
    }
}
