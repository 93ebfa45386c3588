//! Engine tuning.

use std::time::Duration;

/// Time slicing and batch sizing of background analysis.
///
/// Each idle slice analyzes one batch of text. After every batch the batch size is re-estimated
/// from the measured speed so that a batch takes roughly [`time_slice`](Self::time_slice),
/// clamped to `[minimum_batch, maximum_batch]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Target duration of one idle slice.
    pub time_slice: Duration,
    /// Batch size (characters) before the first measurement.
    pub initial_batch: usize,
    /// Lower bound of the adaptive batch size.
    pub minimum_batch: usize,
    /// Upper bound of the adaptive batch size.
    pub maximum_batch: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            time_slice: Duration::from_millis(30),
            initial_batch: 40 * 1024,
            minimum_batch: 1024,
            maximum_batch: 1024 * 1024,
        }
    }
}

impl EngineConfig {
    /// Clamp a measured batch size into the configured bounds.
    pub(crate) fn clamp_batch(&self, batch: usize) -> usize {
        batch.min(self.maximum_batch).max(self.minimum_batch.max(1))
    }
}
