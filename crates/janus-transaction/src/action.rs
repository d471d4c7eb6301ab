use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::continuation::Continuation;
use crate::erased::{ActionWrapper, CallbackWrapper, ErasedAction};

/// Result of a task or compensation: zero or more values on success.
pub type StepResult<T, E> = Result<Vec<T>, E>;

/// An asynchronous unit of work inside a transaction.
///
/// Tasks and compensations share this interface. A task receives the values
/// produced by the previous task (nothing for the first task); a compensation
/// receives exactly the values its task was invoked with.
///
/// Any `Fn(Vec<T>) -> impl Future<Output = StepResult<T, E>>` closure is an
/// `Action`, so most callers never implement this directly.
#[async_trait]
pub trait Action<T, E>: Send + Sync {
    /// Run the action with the given arguments.
    ///
    /// # Errors
    ///
    /// Returns the action's own error if the work could not be done.
    async fn run(&self, args: Vec<T>) -> StepResult<T, E>;
}

#[async_trait]
impl<T, E, F, Fut> Action<T, E> for F
where
    F: Fn(Vec<T>) -> Fut + Send + Sync,
    Fut: Future<Output = StepResult<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    async fn run(&self, args: Vec<T>) -> StepResult<T, E> {
        (self)(args).await
    }
}

/// A registered step: a task and its optional compensation.
pub struct Step<T, E> {
    name: Option<String>,
    pub(crate) task: Box<dyn ErasedAction<T, E>>,
    pub(crate) compensation: Option<Box<dyn ErasedAction<T, E>>>,
}

impl<T, E> Step<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Create an unnamed step without a compensation.
    #[must_use]
    pub fn new<A>(task: A) -> Self
    where
        A: Action<T, E> + 'static,
    {
        Self {
            name: None,
            task: Box::new(ActionWrapper::new(task)),
            compensation: None,
        }
    }

    /// Create an unnamed step from a continuation-passing task.
    ///
    /// The task must fire the [`Continuation`] it is handed. Dropping it
    /// without firing fails the step.
    #[must_use]
    pub fn from_callback<F>(task: F) -> Self
    where
        F: Fn(Vec<T>, Continuation<T, E>) + Send + Sync + 'static,
    {
        Self {
            name: None,
            task: Box::new(CallbackWrapper::new(task)),
            compensation: None,
        }
    }

    /// Name the step. Unnamed steps are called `step-<index>`.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Pair the step with a compensation.
    #[must_use]
    pub fn with_compensation<C>(mut self, compensation: C) -> Self
    where
        C: Action<T, E> + 'static,
    {
        self.compensation = Some(Box::new(ActionWrapper::new(compensation)));
        self
    }

    /// Pair the step with a continuation-passing compensation.
    #[must_use]
    pub fn with_callback_compensation<F>(mut self, compensation: F) -> Self
    where
        F: Fn(Vec<T>, Continuation<T, E>) + Send + Sync + 'static,
    {
        self.compensation = Some(Box::new(CallbackWrapper::new(compensation)));
        self
    }
}

impl<T, E> Step<T, E> {
    /// The explicit name, if one was given.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the step has a compensation.
    #[must_use]
    pub fn has_compensation(&self) -> bool {
        self.compensation.is_some()
    }

    pub(crate) fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("step-{index}"))
    }
}

impl<T, E> fmt::Debug for Step<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("has_compensation", &self.has_compensation())
            .finish_non_exhaustive()
    }
}
