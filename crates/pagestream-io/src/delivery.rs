//! Partial-delivery model for simulated fetches.

use pagestream_core::config::{DeliveryMode, StreamConfig};

/// Decides how many of the requested bytes one fetch actually makes available.
#[derive(Debug, Clone)]
pub struct Delivery {
    mode: DeliveryMode,
    rng: fastrand::Rng,
}

impl Delivery {
    pub fn new(mode: DeliveryMode, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Self { mode, rng }
    }

    pub fn from_config(cfg: &StreamConfig) -> Self {
        Self::new(cfg.delivery, cfg.seed)
    }

    /// Bytes delivered for a request of `requested` bytes; in `[1, requested]`
    /// for any non-empty request.
    pub fn deliver(&mut self, requested: usize) -> usize {
        if requested == 0 {
            return 0;
        }
        match self.mode {
            DeliveryMode::Random => self.rng.usize(1..=requested),
            DeliveryMode::Full => requested,
        }
    }
}
