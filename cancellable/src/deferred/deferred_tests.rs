//! Comprehensive tests for Deferred settlement and callback memory.

#[cfg(test)]
mod tests {
    use crate::deferred::{Deferred, PromiseState};
    use crate::errors::CancellableError;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let reader = Arc::clone(&count);
        (count, move || reader.load(Ordering::SeqCst))
    }

    #[test]
    fn test_new_deferred_is_pending() {
        let deferred: Deferred<i32> = Deferred::new();
        assert_eq!(deferred.state(), PromiseState::Pending);
        assert!(deferred.try_outcome().is_none());
    }

    #[test]
    fn test_resolve_settles_and_runs_done() {
        let deferred: Deferred<i32> = Deferred::new();
        let (count, read) = counter();
        deferred.done(move |value| {
            assert_eq!(*value, 7);
            count.fetch_add(1, Ordering::SeqCst);
        });

        assert!(deferred.resolve(7));
        assert_eq!(deferred.state(), PromiseState::Resolved);
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_reject_settles_and_runs_fail() {
        let deferred: Deferred<i32> = Deferred::new();
        let (count, read) = counter();
        deferred.fail(move |error| {
            assert_eq!(*error, CancellableError::failed("boom"));
            count.fetch_add(1, Ordering::SeqCst);
        });

        assert!(deferred.reject(CancellableError::failed("boom")));
        assert_eq!(deferred.state(), PromiseState::Rejected);
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_second_settlement_is_ignored() {
        let deferred: Deferred<i32> = Deferred::new();
        assert!(deferred.resolve(1));
        assert!(!deferred.resolve(2));
        assert!(!deferred.reject(CancellableError::Cancelled));

        let outcome = deferred.try_outcome().unwrap();
        assert_eq!(*outcome.unwrap(), 1);
    }

    #[test]
    fn test_done_after_resolve_runs_immediately() {
        let deferred: Deferred<i32> = Deferred::new();
        deferred.resolve(42);

        let (count, read) = counter();
        deferred.done(move |value| {
            assert_eq!(*value, 42);
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_fail_after_resolve_is_discarded() {
        let deferred: Deferred<i32> = Deferred::new();
        deferred.resolve(42);

        let (count, read) = counter();
        deferred.fail(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(read(), 0);
    }

    #[test]
    fn test_done_after_reject_is_discarded() {
        let deferred: Deferred<i32> = Deferred::new();
        deferred.reject(CancellableError::Cancelled);

        let (count, read) = counter();
        deferred.done(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(read(), 0);
    }

    #[test]
    fn test_always_runs_on_resolve_and_reject() {
        let resolved: Deferred<i32> = Deferred::new();
        let (count, read) = counter();
        let observer = Arc::clone(&count);
        resolved.always(move |outcome| {
            assert_eq!(outcome, Ok(&5));
            observer.fetch_add(1, Ordering::SeqCst);
        });
        resolved.resolve(5);
        assert_eq!(read(), 1);

        let rejected: Deferred<i32> = Deferred::new();
        let observer = Arc::clone(&count);
        rejected.always(move |outcome| {
            assert!(outcome.is_err());
            observer.fetch_add(1, Ordering::SeqCst);
        });
        rejected.reject(CancellableError::Cancelled);
        assert_eq!(read(), 2);
    }

    #[test]
    fn test_always_after_settlement_runs_immediately() {
        let deferred: Deferred<i32> = Deferred::new();
        deferred.reject(CancellableError::failed("late"));

        let (count, read) = counter();
        deferred.always(move |outcome| {
            assert_eq!(outcome, Err(&CancellableError::failed("late")));
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let deferred: Deferred<i32> = Deferred::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            deferred.done(move |_| order.lock().push(label));
        }
        let always_order = Arc::clone(&order);
        deferred.always(move |_| always_order.lock().push("always"));

        deferred.resolve(0);
        assert_eq!(
            *order.lock(),
            vec!["first", "second", "third", "always"]
        );
    }

    #[test]
    fn test_then_attaches_both_arms() {
        let deferred: Deferred<i32> = Deferred::new();
        let (count, read) = counter();
        let on_reject = Arc::clone(&count);
        deferred.then(
            move |value| {
                assert_eq!(*value, 9);
                count.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                on_reject.fetch_add(100, Ordering::SeqCst);
            },
        );

        deferred.resolve(9);
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_progress_notifies_all_callbacks() {
        let deferred: Deferred<i32, CancellableError, u32> = Deferred::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        deferred.progress(move |update| first.lock().push(("a", *update)));
        let second = Arc::clone(&seen);
        deferred.progress(move |update| second.lock().push(("b", *update)));

        assert!(deferred.notify(10));
        assert!(deferred.notify(20));
        assert_eq!(
            *seen.lock(),
            vec![("a", 10), ("b", 10), ("a", 20), ("b", 20)]
        );
    }

    #[test]
    fn test_progress_replays_last_update_to_late_callback() {
        let deferred: Deferred<i32, CancellableError, u32> = Deferred::new();
        deferred.notify(1);
        deferred.notify(2);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let observer = Arc::clone(&seen);
        deferred.progress(move |update| observer.lock().push(*update));
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_progress_after_settlement_is_inert() {
        let deferred: Deferred<i32, CancellableError, u32> = Deferred::new();
        deferred.notify(5);
        deferred.resolve(0);

        let (count, read) = counter();
        deferred.progress(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });
        assert!(!deferred.notify(6));
        assert_eq!(read(), 0);
    }

    #[test]
    fn test_clones_share_settlement() {
        let deferred: Deferred<i32> = Deferred::new();
        let observer = deferred.clone();

        let (count, read) = counter();
        observer.done(move |value| {
            assert_eq!(*value, 3);
            count.fetch_add(1, Ordering::SeqCst);
        });

        deferred.resolve(3);
        assert_eq!(observer.state(), PromiseState::Resolved);
        assert_eq!(read(), 1);
    }

    #[test]
    fn test_panicking_callback_does_not_poison_others() {
        let deferred: Deferred<i32> = Deferred::new();
        let (count, read) = counter();

        deferred.done(|_| panic!("callback exploded"));
        deferred.done(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        });

        deferred.resolve(1);
        assert_eq!(read(), 1);
        assert_eq!(deferred.state(), PromiseState::Resolved);
    }

    #[test]
    fn test_outcome_is_pending_until_settled() {
        let deferred: Deferred<i32> = Deferred::new();
        let observer = deferred.clone();
        let mut task = tokio_test::task::spawn(async move { observer.outcome().await });

        tokio_test::assert_pending!(task.poll());

        deferred.resolve(4);
        assert!(task.is_woken());
        let outcome = tokio_test::assert_ready!(task.poll());
        assert_eq!(*outcome.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_outcome_returns_after_resolve() {
        let deferred: Deferred<i32> = Deferred::new();
        let producer = deferred.clone();

        let waiter = tokio::spawn(async move { deferred.outcome().await });
        tokio::task::yield_now().await;
        producer.resolve(11);

        let outcome = waiter.await.unwrap();
        assert_eq!(*outcome.unwrap(), 11);
    }

    #[tokio::test]
    async fn test_outcome_is_immediate_when_already_settled() {
        let deferred: Deferred<i32> = Deferred::new();
        deferred.reject(CancellableError::Cancelled);

        let outcome = deferred.outcome().await;
        assert_eq!(*outcome.unwrap_err(), CancellableError::Cancelled);
    }

    #[tokio::test]
    async fn test_settled_reports_final_state() {
        let deferred: Deferred<i32> = Deferred::new();
        let producer = deferred.clone();

        let waiter = tokio::spawn(async move { deferred.settled().await });
        tokio::task::yield_now().await;
        producer.resolve(0);

        assert_eq!(waiter.await.unwrap(), PromiseState::Resolved);
    }
}
