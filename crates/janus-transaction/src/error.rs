use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Error from a single task or compensation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StepFailure<E> {
    /// The step signalled failure.
    #[error("step '{step}' failed")]
    Failed {
        /// Name of the step that failed.
        step: String,
        /// The error the step produced.
        #[source]
        source: E,
    },

    /// The step did not complete within the configured timeout.
    #[error("step '{step}' did not complete within {}ms", timeout.as_millis())]
    TimedOut {
        /// Name of the step that timed out.
        step: String,
        /// The timeout that elapsed.
        timeout: Duration,
    },

    /// A callback-style step dropped its continuation without firing it.
    #[error("step '{step}' dropped its continuation without completing")]
    Abandoned {
        /// Name of the step that abandoned its continuation.
        step: String,
    },
}

impl<E> StepFailure<E> {
    /// Name of the step this failure came from.
    #[must_use]
    pub fn step(&self) -> &str {
        match self {
            Self::Failed { step, .. } | Self::TimedOut { step, .. } | Self::Abandoned { step } => {
                step
            }
        }
    }

    /// The step's own error, if the step signalled one.
    #[must_use]
    pub fn inner(&self) -> Option<&E> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::TimedOut { .. } | Self::Abandoned { .. } => None,
        }
    }

    /// Consume the failure, returning the step's own error if there is one.
    #[must_use]
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Failed { source, .. } => Some(source),
            Self::TimedOut { .. } | Self::Abandoned { .. } => None,
        }
    }
}

/// What happened to the backward pass after a forward failure.
///
/// The three variants never overlap: a rollback that ran and produced no
/// values is `Completed(vec![])`, not `NotRun`.
#[derive(Debug)]
pub enum Rollback<T, E> {
    /// No step completed before the failure, so nothing was compensated.
    NotRun,
    /// Every compensation succeeded. Holds the values produced by the last
    /// compensation that ran.
    Completed(Vec<T>),
    /// A compensation failed; the remaining compensations were not run.
    Failed(StepFailure<E>),
}

impl<T, E> Rollback<T, E> {
    /// Whether the backward pass ran at all.
    #[must_use]
    pub fn ran(&self) -> bool {
        !matches!(self, Self::NotRun)
    }

    /// The compensation failure, if one occurred.
    #[must_use]
    pub fn error(&self) -> Option<&StepFailure<E>> {
        match self {
            Self::Failed(error) => Some(error),
            Self::NotRun | Self::Completed(_) => None,
        }
    }

    /// The values of a cleanly completed backward pass.
    #[must_use]
    pub fn result(&self) -> Option<&[T]> {
        match self {
            Self::Completed(values) => Some(values),
            Self::NotRun | Self::Failed(_) => None,
        }
    }

    /// Split into `(rollback error, rollback result)`. At most one is `Some`;
    /// both are `None` only when the backward pass did not run.
    #[must_use]
    pub fn into_parts(self) -> (Option<StepFailure<E>>, Option<Vec<T>>) {
        match self {
            Self::NotRun => (None, None),
            Self::Completed(values) => (None, Some(values)),
            Self::Failed(error) => (Some(error), None),
        }
    }
}

impl<T, E> fmt::Display for Rollback<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRun => f.write_str("nothing to roll back"),
            Self::Completed(_) => f.write_str("rolled back"),
            Self::Failed(error) => write!(f, "rollback failed: {error}"),
        }
    }
}

/// Error from transaction execution: the forward failure plus the outcome of
/// the rollback it triggered.
#[derive(Debug, Error)]
#[error("{error}, {rollback}")]
pub struct TransactionFailure<T, E> {
    /// The failure that stopped the forward pass.
    #[source]
    pub error: StepFailure<E>,
    /// Outcome of the backward pass.
    pub rollback: Rollback<T, E>,
}

impl<T, E> TransactionFailure<T, E> {
    /// Split into `(original failure, rollback error, rollback result)`.
    #[must_use]
    pub fn into_parts(self) -> (StepFailure<E>, Option<StepFailure<E>>, Option<Vec<T>>) {
        let (rollback_error, rollback_result) = self.rollback.into_parts();
        (self.error, rollback_error, rollback_result)
    }
}
