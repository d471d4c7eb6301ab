use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, info, warn};

use crate::action::{Step, StepResult};
use crate::audit::TransactionAuditLog;
use crate::continuation::Continuation;
use crate::erased::ErasedAction;
use crate::error::{Rollback, StepFailure, TransactionFailure};
use crate::options::TransactionOptions;
use crate::sequence::{Progress, SequenceStep, run_sequential_observed};

/// Lifecycle of a transaction execution.
///
/// ```text
/// Pending -> RunningForward -> Succeeded
///                           -> Failed                      (first task failed)
///                           -> RunningBackward -> RolledBack
///                                              -> RollbackFailed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum TransactionState {
    #[default]
    Pending,
    RunningForward,
    Succeeded,
    /// A task failed before any task completed; nothing was compensated.
    Failed,
    RunningBackward,
    RolledBack,
    RollbackFailed,
}

impl TransactionState {
    /// Whether execution has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::RolledBack | Self::RollbackFailed
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::RunningForward => "running forward",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::RunningBackward => "running backward",
            Self::RolledBack => "rolled back",
            Self::RollbackFailed => "rollback failed",
        })
    }
}

/// Progress of the forward pass: how many tasks completed, and the arguments
/// each completed task was invoked with.
struct ForwardState<T> {
    completed: usize,
    records: Vec<Vec<T>>,
}

impl<T> ForwardState<T> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            completed: 0,
            records: Vec::with_capacity(capacity),
        }
    }

    /// Transition after the task at index `completed` succeeded with `args`.
    fn advance(mut self, args: Vec<T>) -> Self {
        self.records.push(args);
        self.completed += 1;
        self
    }
}

enum ForwardOutcome<T, E> {
    Succeeded(Vec<T>),
    Failed {
        error: StepFailure<E>,
        state: ForwardState<T>,
    },
}

/// An ordered list of tasks, each optionally paired with a compensation.
///
/// Tasks run in the order they were added, each receiving the values produced
/// by the previous one. If a task fails, the compensations of the tasks that
/// completed run in reverse order, each receiving the arguments its task was
/// invoked with.
///
/// Executing consumes the transaction, so it runs at most once.
pub struct Transaction<T, E> {
    steps: Vec<Step<T, E>>,
    options: TransactionOptions,
}

impl<T, E> Default for Transaction<T, E> {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            options: TransactionOptions::default(),
        }
    }
}

impl<T, E> fmt::Debug for Transaction<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("steps", &self.steps)
            .field("options", &self.options)
            .finish()
    }
}

impl<T, E> Transaction<T, E>
where
    T: Clone + Send + 'static,
    E: Send + 'static,
{
    /// Create an empty transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the execution options.
    #[must_use]
    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }

    /// Add a task and the compensation that undoes it.
    #[must_use]
    pub fn add<F, Fut, C, CFut>(self, task: F, compensation: C) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult<T, E>> + Send + 'static,
        C: Fn(Vec<T>) -> CFut + Send + Sync + 'static,
        CFut: Future<Output = StepResult<T, E>> + Send + 'static,
    {
        self.add_step(Step::new(task).with_compensation(compensation))
    }

    /// Add a task with nothing to undo. It is skipped during rollback.
    #[must_use]
    pub fn add_uncompensated<F, Fut>(self, task: F) -> Self
    where
        F: Fn(Vec<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = StepResult<T, E>> + Send + 'static,
    {
        self.add_step(Step::new(task))
    }

    /// Add a task and compensation written in continuation-passing style.
    #[must_use]
    pub fn add_callback<F, C>(self, task: F, compensation: C) -> Self
    where
        F: Fn(Vec<T>, Continuation<T, E>) + Send + Sync + 'static,
        C: Fn(Vec<T>, Continuation<T, E>) + Send + Sync + 'static,
    {
        self.add_step(Step::from_callback(task).with_callback_compensation(compensation))
    }

    /// Add a fully configured step.
    #[must_use]
    pub fn add_step(mut self, step: Step<T, E>) -> Self {
        self.steps.push(step);
        self
    }

    /// Number of registered steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute the transaction, reporting through exactly one of two
    /// callbacks.
    ///
    /// `on_success` receives the last task's values. `on_failure` receives the
    /// original failure, the compensation failure (if a compensation failed),
    /// and the rollback's values (if every compensation succeeded). Both
    /// rollback fields are `None` only when no task completed and so nothing
    /// was rolled back.
    pub async fn execute<S, F>(self, on_success: S, on_failure: F)
    where
        S: FnOnce(Vec<T>),
        F: FnOnce(StepFailure<E>, Option<StepFailure<E>>, Option<Vec<T>>),
    {
        match self.run().await {
            Ok(values) => on_success(values),
            Err(failure) => {
                let (error, rollback_error, rollback_result) = failure.into_parts();
                on_failure(error, rollback_error, rollback_result);
            }
        }
    }

    /// Execute the transaction, returning the last task's values.
    ///
    /// # Errors
    ///
    /// Returns a [`TransactionFailure`] carrying the task failure and the
    /// outcome of the rollback it triggered.
    pub async fn run(self) -> Result<Vec<T>, TransactionFailure<T, E>> {
        let (result, _audit_log) = self.run_with_audit().await;
        result
    }

    /// Execute the transaction and return both the result and an audit log.
    pub async fn run_with_audit(
        self,
    ) -> (Result<Vec<T>, TransactionFailure<T, E>>, TransactionAuditLog) {
        let mut audit_log = TransactionAuditLog::new();
        audit_log.set_state(TransactionState::RunningForward);
        info!(steps = self.steps.len(), "executing transaction");

        let (error, state) = match self.run_forward(&mut audit_log).await {
            ForwardOutcome::Succeeded(values) => {
                audit_log.set_state(TransactionState::Succeeded);
                info!(values = values.len(), "transaction succeeded");
                return (Ok(values), audit_log);
            }
            ForwardOutcome::Failed { error, state } => (error, state),
        };

        let rollback = self.run_backward(state, &mut audit_log).await;

        let final_state = match &rollback {
            Rollback::NotRun => TransactionState::Failed,
            Rollback::Completed(_) => TransactionState::RolledBack,
            Rollback::Failed(_) => TransactionState::RollbackFailed,
        };
        audit_log.set_state(final_state);
        match &rollback {
            Rollback::Failed(rollback_error) => warn!(
                failed_step = error.step(),
                compensation = rollback_error.step(),
                "transaction rollback failed"
            ),
            Rollback::NotRun | Rollback::Completed(_) => {
                info!(failed_step = error.step(), state = %final_state, "transaction failed");
            }
        }

        (Err(TransactionFailure { error, rollback }), audit_log)
    }

    async fn run_forward(&self, audit_log: &mut TransactionAuditLog) -> ForwardOutcome<T, E> {
        let timeout = self.options.step_timeout();
        let mut state = ForwardState::with_capacity(self.steps.len());
        let mut values = Vec::new();

        for (index, step) in self.steps.iter().enumerate() {
            let name = step.display_name(index);
            debug!(step = %name, index, args = values.len(), "running task");
            audit_log.record_start(index, &name);

            let args = values.clone();
            match invoke(&name, step.task.as_ref(), values, timeout).await {
                Ok(output) => {
                    audit_log.record_success();
                    state = state.advance(args);
                    values = output;
                }
                Err(error) => {
                    audit_log.record_failure();
                    warn!(step = %name, index, completed = state.completed, "task failed");
                    return ForwardOutcome::Failed { error, state };
                }
            }
        }

        ForwardOutcome::Succeeded(values)
    }

    async fn run_backward(
        &self,
        state: ForwardState<T>,
        audit_log: &mut TransactionAuditLog,
    ) -> Rollback<T, E> {
        if state.completed == 0 {
            return Rollback::NotRun;
        }

        audit_log.set_state(TransactionState::RunningBackward);
        let timeout = self.options.compensation_timeout();
        let mut indices = Vec::with_capacity(state.completed);
        let mut backward: Vec<SequenceStep<'_, T, StepFailure<E>>> =
            Vec::with_capacity(state.completed);

        for (index, (step, args)) in self.steps.iter().zip(state.records).enumerate().rev() {
            let Some(compensation) = step.compensation.as_deref() else {
                debug!(index, "no compensation registered, skipping");
                audit_log.record_not_compensated(index);
                continue;
            };
            let name = step.display_name(index);
            indices.push(index);
            backward.push(Box::new(move |_previous: Vec<T>| {
                async move { invoke(&name, compensation, args, timeout).await }.boxed()
            }));
        }

        info!(
            completed = state.completed,
            compensations = backward.len(),
            "rolling back"
        );

        let result = run_sequential_observed(backward, Vec::new(), |progress| match progress {
            Progress::Started(position) => {
                debug!(index = indices[position], "running compensation");
            }
            Progress::Succeeded(position) => audit_log.record_compensated(indices[position]),
            Progress::Failed(position) => audit_log.record_compensation_failed(indices[position]),
        })
        .await;

        match result {
            Ok(values) => Rollback::Completed(values),
            Err(error) => Rollback::Failed(error),
        }
    }
}

async fn invoke<T, E>(
    name: &str,
    action: &dyn ErasedAction<T, E>,
    args: Vec<T>,
    timeout: Option<Duration>,
) -> Result<Vec<T>, StepFailure<E>> {
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, action.invoke(args)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => {
                return Err(StepFailure::TimedOut {
                    step: name.to_string(),
                    timeout: limit,
                });
            }
        },
        None => action.invoke(args).await,
    };

    outcome.map_err(|interruption| interruption.into_failure(name))
}
