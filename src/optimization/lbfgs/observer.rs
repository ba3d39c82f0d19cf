//! Per-iteration progress hooks.
//!
//! The solver reports `(iteration, loss, gradient_norm, step_size)` once per
//! completed line search. [`LogObserver`] forwards each record to the `log`
//! facade at info level; [`RecordingObserver`] keeps them for inspection in
//! tests and diagnostics.
use log::info;

/// Snapshot of one iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub iteration: usize,
    pub loss: f64,
    pub gradient_norm: f64,
    pub step_size: f64,
}

pub trait IterationObserver {
    fn observe(&mut self, record: &IterationRecord);
}

/// Discards every record.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl IterationObserver for NoopObserver {
    fn observe(&mut self, _record: &IterationRecord) {}
}

/// Logs every record at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl IterationObserver for LogObserver {
    fn observe(&mut self, record: &IterationRecord) {
        info!(
            "iter {}: loss = {:.6e}, |grad| = {:.6e}, step = {:.4e}",
            record.iteration, record.loss, record.gradient_norm, record.step_size
        );
    }
}

/// Collects every record in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    records: Vec<IterationRecord>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<IterationRecord> {
        self.records
    }
}

impl IterationObserver for RecordingObserver {
    fn observe(&mut self, record: &IterationRecord) {
        self.records.push(*record);
    }
}
