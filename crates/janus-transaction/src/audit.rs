use std::time::Instant;

use crate::transaction::TransactionState;

/// Status of a step in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepStatus {
    /// Task started and has not finished.
    Running,
    /// Task completed successfully.
    Executed,
    /// Task failed.
    Failed,
    /// Task completed and its compensation succeeded.
    Compensated,
    /// Task completed and its compensation failed.
    CompensationFailed,
    /// Task completed but had no compensation to run.
    NotCompensated,
}

/// Record of a step's execution in the transaction.
#[derive(Debug)]
pub struct StepRecord {
    /// Position of the step in the transaction.
    pub index: usize,
    /// Name of the step.
    pub name: String,
    /// Current status.
    pub status: StepStatus,
    /// When the task started executing.
    pub started_at: Instant,
    /// When the task finished.
    pub completed_at: Option<Instant>,
    /// When the compensation finished, if it ran.
    pub compensated_at: Option<Instant>,
}

/// Audit log tracking every task and compensation of one execution.
#[derive(Debug, Default)]
pub struct TransactionAuditLog {
    records: Vec<StepRecord>,
    state: TransactionState,
}

impl TransactionAuditLog {
    /// Create a new empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_state(&mut self, state: TransactionState) {
        self.state = state;
    }

    /// Record a task starting.
    pub(crate) fn record_start(&mut self, index: usize, name: &str) {
        self.records.push(StepRecord {
            index,
            name: name.to_string(),
            status: StepStatus::Running,
            started_at: Instant::now(),
            completed_at: None,
            compensated_at: None,
        });
    }

    /// Mark the last task as completed successfully.
    pub(crate) fn record_success(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Executed;
            record.completed_at = Some(Instant::now());
        }
    }

    /// Mark the last task as failed.
    pub(crate) fn record_failure(&mut self) {
        if let Some(record) = self.records.last_mut() {
            record.status = StepStatus::Failed;
            record.completed_at = Some(Instant::now());
        }
    }

    pub(crate) fn record_compensated(&mut self, index: usize) {
        self.finish_compensation(index, StepStatus::Compensated);
    }

    pub(crate) fn record_compensation_failed(&mut self, index: usize) {
        self.finish_compensation(index, StepStatus::CompensationFailed);
    }

    pub(crate) fn record_not_compensated(&mut self, index: usize) {
        if let Some(record) = self.record_mut(index) {
            record.status = StepStatus::NotCompensated;
        }
    }

    fn finish_compensation(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.record_mut(index) {
            record.status = status;
            record.compensated_at = Some(Instant::now());
        }
    }

    fn record_mut(&mut self, index: usize) -> Option<&mut StepRecord> {
        self.records.iter_mut().find(|record| record.index == index)
    }

    /// Get all records in the audit log, in execution order of the tasks.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Get the record for the step at `index`, if that step started.
    #[must_use]
    pub fn record(&self, index: usize) -> Option<&StepRecord> {
        self.records.iter().find(|record| record.index == index)
    }

    /// The state the transaction ended in.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Get a summary of the execution for display.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("transaction {}", self.state)];
        for record in &self.records {
            let status = match record.status {
                StepStatus::Running => "…",
                StepStatus::Executed => "✓",
                StepStatus::Failed => "✗",
                StepStatus::Compensated => "↩",
                StepStatus::CompensationFailed => "⚠",
                StepStatus::NotCompensated => "·",
            };
            lines.push(format!("{status} {}", record.name));
        }
        lines.join("\n")
    }
}
