//! Integration tests for transaction audit logging.

use janus_transaction::{Step, StepResult, StepStatus, Transaction, TransactionState};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
struct TestError(String);

async fn increment(args: Vec<i32>) -> StepResult<i32, TestError> {
    Ok(vec![args.first().copied().unwrap_or(0) + 1])
}

async fn undo(_args: Vec<i32>) -> StepResult<i32, TestError> {
    Ok(Vec::new())
}

async fn undo_fails(_args: Vec<i32>) -> StepResult<i32, TestError> {
    Err(TestError("compensation failed".to_string()))
}

async fn fail(_args: Vec<i32>) -> StepResult<i32, TestError> {
    Err(TestError("intentional failure".to_string()))
}

fn simple(name: &'static str) -> Step<i32, TestError> {
    Step::new(increment).named(name).with_compensation(undo)
}

fn statuses(records: &[janus_transaction::StepRecord]) -> Vec<(&str, StepStatus)> {
    records
        .iter()
        .map(|record| (record.name.as_str(), record.status))
        .collect()
}

#[tokio::test]
async fn successful_execution_logs_all_steps_as_executed() {
    let (result, audit_log) = Transaction::new()
        .add_step(simple("step_a"))
        .add_step(simple("step_b"))
        .add_step(simple("step_c"))
        .run_with_audit()
        .await;

    assert!(result.is_ok());
    assert_eq!(audit_log.state(), TransactionState::Succeeded);
    assert_eq!(
        statuses(audit_log.records()),
        vec![
            ("step_a", StepStatus::Executed),
            ("step_b", StepStatus::Executed),
            ("step_c", StepStatus::Executed),
        ]
    );
    for record in audit_log.records() {
        assert!(record.completed_at.is_some());
        assert!(record.compensated_at.is_none());
    }
}

#[tokio::test]
async fn rolled_back_execution_logs_compensations() {
    let (result, audit_log) = Transaction::new()
        .add_step(simple("step_a"))
        .add_step(simple("step_b"))
        .add_step(Step::new(fail).named("failing"))
        .run_with_audit()
        .await;

    assert!(result.is_err());
    assert_eq!(audit_log.state(), TransactionState::RolledBack);
    assert_eq!(
        statuses(audit_log.records()),
        vec![
            ("step_a", StepStatus::Compensated),
            ("step_b", StepStatus::Compensated),
            ("failing", StepStatus::Failed),
        ]
    );

    let step_a = audit_log.record(0).expect("step_a started");
    let step_b = audit_log.record(1).expect("step_b started");
    let compensated_a = step_a.compensated_at.expect("step_a compensated");
    let compensated_b = step_b.compensated_at.expect("step_b compensated");
    assert!(compensated_b <= compensated_a);
}

#[tokio::test]
async fn steps_after_the_failure_never_appear() {
    let (result, audit_log) = Transaction::new()
        .add_step(simple("step_a"))
        .add_step(Step::new(fail).named("failing"))
        .add_step(simple("never_reached"))
        .run_with_audit()
        .await;

    assert!(result.is_err());
    assert_eq!(audit_log.records().len(), 2);
    assert!(audit_log.record(2).is_none());
}

#[tokio::test]
async fn first_step_failure_leaves_transaction_failed() {
    let (result, audit_log) = Transaction::new()
        .add_step(Step::new(fail).named("failing").with_compensation(undo))
        .add_step(simple("never_reached"))
        .run_with_audit()
        .await;

    assert!(result.is_err());
    assert_eq!(audit_log.state(), TransactionState::Failed);
    assert_eq!(
        statuses(audit_log.records()),
        vec![("failing", StepStatus::Failed)]
    );
}

#[tokio::test]
async fn compensation_failure_is_logged_and_earlier_steps_stay_executed() {
    let (result, audit_log) = Transaction::new()
        .add_step(simple("step_a"))
        .add_step(Step::new(increment).named("stuck").with_compensation(undo_fails))
        .add_step(simple("step_c"))
        .add_step(Step::new(fail).named("failing"))
        .run_with_audit()
        .await;

    assert!(result.is_err());
    assert_eq!(audit_log.state(), TransactionState::RollbackFailed);
    assert_eq!(
        statuses(audit_log.records()),
        vec![
            ("step_a", StepStatus::Executed),
            ("stuck", StepStatus::CompensationFailed),
            ("step_c", StepStatus::Compensated),
            ("failing", StepStatus::Failed),
        ]
    );
}

#[tokio::test]
async fn uncompensated_steps_are_marked_during_rollback() {
    let (result, audit_log) = Transaction::new()
        .add_step(simple("step_a"))
        .add_uncompensated(increment)
        .add_uncompensated(fail)
        .run_with_audit()
        .await;

    assert!(result.is_err());
    assert_eq!(
        statuses(audit_log.records()),
        vec![
            ("step_a", StepStatus::Compensated),
            ("step-1", StepStatus::NotCompensated),
            ("step-2", StepStatus::Failed),
        ]
    );
}

#[tokio::test]
async fn summary_lists_state_and_each_step() {
    let (_result, audit_log) = Transaction::new()
        .add_step(simple("reserve"))
        .add_step(Step::new(fail).named("charge"))
        .run_with_audit()
        .await;

    assert_eq!(audit_log.summary(), "transaction rolled back\n↩ reserve\n✗ charge");
}
