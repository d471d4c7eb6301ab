//! Sequential runner ("waterfall") used for the backward pass.
//!
//! Steps run one after another; each receives the values produced by the
//! previous one. The first failure stops the run.

use futures::future::BoxFuture;

/// A single step of a sequential run.
pub type SequenceStep<'a, T, E> =
    Box<dyn FnOnce(Vec<T>) -> BoxFuture<'a, Result<Vec<T>, E>> + Send + 'a>;

/// Progress notification emitted by [`run_sequential_observed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The step at this position is about to run.
    Started(usize),
    /// The step at this position succeeded.
    Succeeded(usize),
    /// The step at this position failed; no further steps run.
    Failed(usize),
}

/// Run `steps` in order, threading each step's values into the next.
///
/// Returns the last step's values, or `initial` if `steps` is empty.
///
/// # Errors
///
/// Returns the first error produced by a step.
pub async fn run_sequential<'a, T, E>(
    steps: Vec<SequenceStep<'a, T, E>>,
    initial: Vec<T>,
) -> Result<Vec<T>, E> {
    run_sequential_observed(steps, initial, |_| {}).await
}

/// Like [`run_sequential`], reporting each step's progress to `observe`.
///
/// # Errors
///
/// Returns the first error produced by a step.
pub async fn run_sequential_observed<'a, T, E, O>(
    steps: Vec<SequenceStep<'a, T, E>>,
    initial: Vec<T>,
    mut observe: O,
) -> Result<Vec<T>, E>
where
    O: FnMut(Progress),
{
    let mut values = initial;

    for (position, step) in steps.into_iter().enumerate() {
        observe(Progress::Started(position));
        match step(values).await {
            Ok(output) => {
                observe(Progress::Succeeded(position));
                values = output;
            }
            Err(error) => {
                observe(Progress::Failed(position));
                return Err(error);
            }
        }
    }

    Ok(values)
}
