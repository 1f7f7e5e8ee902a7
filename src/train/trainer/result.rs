//! Training result types

use crate::train::handle::StepCounters;

/// Result of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainResult {
    /// Counters when training ended
    pub counters: StepCounters,
    /// Whether a callback stopped training
    pub stopped_early: bool,
    /// Total training time in seconds
    pub elapsed_secs: f64,
}
