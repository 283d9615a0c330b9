use serde::{Serialize, Deserialize};

/// Per-epoch training statistics.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop sends one `EpochStats` at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    pub total_epochs: usize,
    /// Training cost (loss plus regularization) for this epoch.
    pub cost: f64,
    /// Training accuracy at the first threshold, when accuracy is a training metric.
    pub accuracy: Option<f64>,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}
