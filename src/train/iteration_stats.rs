use serde::{Deserialize, Serialize};

/// Training statistics emitted by `train_loop` at each report point.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, one value is
/// sent every `report_every` iterations and once more after the final one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationStats {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Total iterations requested for this run.
    pub total_iterations: usize,
    /// Squared-error loss after this iteration's update.
    pub loss: f32,
    /// Wall-clock time since the run started, in milliseconds.
    pub elapsed_ms: u64,
}
