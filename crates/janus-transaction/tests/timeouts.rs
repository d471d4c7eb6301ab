//! Integration tests for step and compensation timeouts.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use janus_transaction::{
    Continuation, Step, StepFailure, StepResult, Transaction, TransactionOptions,
    TransactionState,
};

#[derive(Debug, PartialEq, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

async fn quick(args: Vec<i32>) -> StepResult<i32, TestError> {
    Ok(vec![args.first().copied().unwrap_or(0) + 1])
}

async fn slow(_args: Vec<i32>) -> StepResult<i32, TestError> {
    tokio::time::sleep(Duration::from_secs(3600)).await;
    Ok(vec![0])
}

async fn undo(_args: Vec<i32>) -> StepResult<i32, TestError> {
    Ok(vec![42])
}

async fn fail(_args: Vec<i32>) -> StepResult<i32, TestError> {
    Err(TestError("boom".to_string()))
}

#[tokio::test(start_paused = true)]
async fn slow_task_times_out_and_triggers_rollback() {
    let options = TransactionOptions::new().with_step_timeout(Duration::from_millis(50));

    let (result, audit_log) = Transaction::new()
        .with_options(options)
        .add_step(Step::new(quick).named("reserve").with_compensation(undo))
        .add_step(Step::new(slow).named("charge"))
        .run_with_audit()
        .await;

    let failure = result.expect_err("slow step times out");
    match &failure.error {
        StepFailure::TimedOut { step, timeout } => {
            assert_eq!(step, "charge");
            assert_eq!(*timeout, Duration::from_millis(50));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(failure.error.inner().is_none());
    assert_eq!(failure.rollback.result(), Some(&[42][..]));
    assert_eq!(audit_log.state(), TransactionState::RolledBack);
}

#[tokio::test(start_paused = true)]
async fn task_within_timeout_succeeds() -> anyhow::Result<()> {
    let options = TransactionOptions::new().with_step_timeout(Duration::from_secs(1));

    let values = Transaction::new()
        .with_options(options)
        .add_uncompensated(|args: Vec<i32>| async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok::<_, TestError>(args)
        })
        .add_uncompensated(quick)
        .run()
        .await?;

    assert_eq!(values, vec![1]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_compensation_times_out() {
    let options = TransactionOptions::new()
        .with_compensation_timeout(Duration::from_millis(20));

    let result = Transaction::new()
        .with_options(options)
        .add_step(Step::new(quick).named("first").with_compensation(undo))
        .add_step(Step::new(quick).named("second").with_compensation(slow))
        .add_uncompensated(fail)
        .run()
        .await;

    let (error, rollback_error, rollback_result) =
        result.expect_err("third step fails").into_parts();
    assert_eq!(error.into_inner(), Some(TestError("boom".to_string())));
    assert!(matches!(
        rollback_error,
        Some(StepFailure::TimedOut { ref step, .. }) if step == "second"
    ));
    assert!(rollback_result.is_none());
}

#[tokio::test(start_paused = true)]
async fn step_timeout_does_not_apply_to_compensations() {
    let options = TransactionOptions::new().with_step_timeout(Duration::from_millis(20));

    let result = Transaction::new()
        .with_options(options)
        .add(quick, |_args: Vec<i32>| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(vec![7])
        })
        .add_uncompensated(fail)
        .run()
        .await;

    let failure = result.expect_err("second step fails");
    assert_eq!(failure.rollback.result(), Some(&[7][..]));
}

#[tokio::test(start_paused = true)]
async fn held_continuation_times_out_instead_of_hanging() {
    let held: Arc<Mutex<Vec<Continuation<i32, TestError>>>> = Arc::new(Mutex::new(Vec::new()));
    let stash = Arc::clone(&held);
    let options = TransactionOptions::new().with_step_timeout(Duration::from_millis(50));

    let result = Transaction::new()
        .with_options(options)
        .add_step(
            Step::from_callback(move |_args: Vec<i32>, next: Continuation<i32, TestError>| {
                stash.lock().expect("stash lock").push(next);
            })
            .named("waiting"),
        )
        .run()
        .await;

    let failure = result.expect_err("held continuation times out");
    assert!(matches!(
        failure.error,
        StepFailure::TimedOut { ref step, .. } if step == "waiting"
    ));
    assert!(!failure.rollback.ran());

    let continuation = held.lock().expect("stash lock").pop().expect("continuation held");
    assert!(!continuation.is_pending());
    continuation.succeed(vec![1]);
}
