use std::sync::mpsc;
use std::sync::{atomic::AtomicBool, Arc};

use crate::train::iteration_stats::IterationStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `iterations`  : forward/backward/update rounds to run
/// - `report_every`: evaluate and report the loss every this many
///                    iterations; `0` reports only after the last one
/// - `progress_tx` : optional channel sender; one `IterationStats` is sent
///                    per report. If the receiver is dropped the loop stops.
/// - `stop_flag`   : optional atomic flag; when set to `true` from another
///                    thread the loop stops after the current iteration.
pub struct TrainConfig {
    pub iterations: usize,
    pub report_every: usize,
    pub progress_tx: Option<mpsc::Sender<IterationStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Creates a minimal `TrainConfig` with no progress channel and no stop flag.
    pub fn new(iterations: usize, report_every: usize) -> Self {
        TrainConfig {
            iterations,
            report_every,
            progress_tx: None,
            stop_flag: None,
        }
    }
}
