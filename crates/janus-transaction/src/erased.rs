use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::BoxFuture;

use crate::action::Action;
use crate::continuation::Continuation;
use crate::error::StepFailure;

/// Why an erased action did not produce values.
#[derive(Debug)]
pub(crate) enum Interruption<E> {
    Failed(E),
    Abandoned,
}

impl<E> Interruption<E> {
    pub(crate) fn into_failure(self, step: &str) -> StepFailure<E> {
        match self {
            Self::Failed(source) => StepFailure::Failed {
                step: step.to_string(),
                source,
            },
            Self::Abandoned => StepFailure::Abandoned {
                step: step.to_string(),
            },
        }
    }
}

/// Uniform entry point for tasks and compensations, whichever calling
/// convention they were written in.
pub(crate) trait ErasedAction<T, E>: Send + Sync {
    fn invoke(&self, args: Vec<T>) -> BoxFuture<'_, Result<Vec<T>, Interruption<E>>>;
}

pub(crate) struct ActionWrapper<A> {
    action: A,
}

impl<A> ActionWrapper<A> {
    pub(crate) fn new(action: A) -> Self {
        Self { action }
    }
}

impl<T, E, A> ErasedAction<T, E> for ActionWrapper<A>
where
    A: Action<T, E>,
    T: Send + 'static,
    E: Send + 'static,
{
    fn invoke(&self, args: Vec<T>) -> BoxFuture<'_, Result<Vec<T>, Interruption<E>>> {
        self.action
            .run(args)
            .map(|result| result.map_err(Interruption::Failed))
            .boxed()
    }
}

pub(crate) struct CallbackWrapper<F> {
    callback: F,
}

impl<F> CallbackWrapper<F> {
    pub(crate) fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<T, E, F> ErasedAction<T, E> for CallbackWrapper<F>
where
    F: Fn(Vec<T>, Continuation<T, E>) + Send + Sync,
    T: Send + 'static,
    E: Send + 'static,
{
    fn invoke(&self, args: Vec<T>) -> BoxFuture<'_, Result<Vec<T>, Interruption<E>>> {
        let (sender, receiver) = oneshot::channel();
        (self.callback)(args, Continuation::new(sender));

        async move {
            match receiver.await {
                Ok(result) => result.map_err(Interruption::Failed),
                Err(oneshot::Canceled) => Err(Interruption::Abandoned),
            }
        }
        .boxed()
    }
}
