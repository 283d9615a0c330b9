use std::sync::mpsc;

use crate::train::epoch_stats::EpochStats;

/// Configuration for a `Sequential::train_with` run.
///
/// # Fields
/// - `epochs`      — number of full forward/backward/update cycles
/// - `verbose`     — log the training metrics after every epoch
/// - `progress_tx` — optional channel; one `EpochStats` is sent per completed
///                   epoch. A dropped receiver does not stop training.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub epochs: usize,
    pub verbose: bool,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel.
    pub fn new(epochs: usize, verbose: bool) -> Self {
        TrainConfig { epochs, verbose, progress_tx: None }
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }
}
