use std::time::Duration;

use serde::Deserialize;

/// Per-transaction execution settings.
///
/// Deserializes from a kebab-case table, for example:
///
/// ```toml
/// step-timeout-ms = 5000
/// compensation-timeout-ms = 10000
/// ```
///
/// Timeouts rely on `tokio::time` and therefore require a Tokio runtime with
/// the time driver enabled. Without timeouts the executor runs on any
/// executor, and a step that never completes stalls its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TransactionOptions {
    /// Upper bound for each forward task, in milliseconds.
    pub step_timeout_ms: Option<u64>,
    /// Upper bound for each compensation, in milliseconds.
    pub compensation_timeout_ms: Option<u64>,
}

impl TransactionOptions {
    /// Options with no timeouts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound every forward task by `timeout`.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_ms = Some(duration_to_millis(timeout));
        self
    }

    /// Bound every compensation by `timeout`.
    #[must_use]
    pub fn with_compensation_timeout(mut self, timeout: Duration) -> Self {
        self.compensation_timeout_ms = Some(duration_to_millis(timeout));
        self
    }

    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }

    #[must_use]
    pub fn compensation_timeout(&self) -> Option<Duration> {
        self.compensation_timeout_ms.map(Duration::from_millis)
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
