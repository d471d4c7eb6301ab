//! Compensating transactions for asynchronous steps.
//!
//! A [`Transaction`] runs its tasks in order, feeding each task's values into
//! the next. If a task fails, the compensations of the tasks that completed run
//! in reverse order, each with the arguments its task received, and the caller
//! learns the original failure, the compensation failure (if any), and the
//! rollback's values (if it completed).
//!
//! ```
//! use janus_transaction::Transaction;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let result = Transaction::<i32, String>::new()
//!     .add(
//!         |_args| async { Ok(vec![7]) },
//!         |_args| async { Ok(vec![]) },
//!     )
//!     .add_uncompensated(|_args| async { Err("boom".to_string()) })
//!     .run()
//!     .await;
//!
//! let failure = result.unwrap_err();
//! assert_eq!(failure.error.into_inner(), Some("boom".to_string()));
//! # }
//! ```

mod action;
mod audit;
mod continuation;
mod erased;
mod error;
mod options;
pub mod sequence;
mod transaction;

pub use action::{Action, Step, StepResult};
pub use audit::{StepRecord, StepStatus, TransactionAuditLog};
pub use continuation::Continuation;
pub use error::{Rollback, StepFailure, TransactionFailure};
pub use options::TransactionOptions;
pub use transaction::{Transaction, TransactionState};
