use futures::channel::oneshot;
use tracing::debug;

use crate::action::StepResult;

/// Single-shot completion handle for continuation-passing steps.
///
/// Every method consumes the continuation, so a step can complete at most
/// once. A continuation that is dropped without being fired fails the step
/// with [`StepFailure::Abandoned`](crate::StepFailure::Abandoned) instead of
/// stalling the transaction.
#[derive(Debug)]
#[must_use = "a step must fire its continuation exactly once"]
pub struct Continuation<T, E> {
    sender: oneshot::Sender<StepResult<T, E>>,
}

impl<T, E> Continuation<T, E> {
    pub(crate) fn new(sender: oneshot::Sender<StepResult<T, E>>) -> Self {
        Self { sender }
    }

    /// Complete the step successfully with zero or more values.
    pub fn succeed(self, values: Vec<T>) {
        self.complete(Ok(values));
    }

    /// Complete the step with a failure.
    pub fn fail(self, error: E) {
        self.complete(Err(error));
    }

    /// Complete the step with an already-built result.
    pub fn complete(self, result: StepResult<T, E>) {
        if self.sender.send(result).is_err() {
            // The transaction stopped waiting (e.g. the step timed out).
            debug!("continuation fired after its step was abandoned");
        }
    }

    /// Whether the transaction is still waiting on this continuation.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        !self.sender.is_canceled()
    }
}
