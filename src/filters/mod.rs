//! Signal filtering algorithms for smoothing eye-ratio and head-pose signals.
//!
//! Each tracked scalar (two eye ratios, head roll, head pitch) gets its own
//! filter instance. Filters must never suppress the first reading: with fewer
//! than two buffered samples they return the raw input unchanged.

/// Weighted moving average with a recency-biased weight ramp
pub mod weighted;

use crate::Result;
use serde::{Deserialize, Serialize};

pub use weighted::WeightedMovingAverage;

/// Trait for all scalar signal filters
pub trait SignalFilter: Send + Sync {
    /// Push a new sample and return the smoothed value
    fn apply(&mut self, value: f64) -> f64;

    /// Last smoothed value, if any sample has been applied
    fn current(&self) -> Option<f64>;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// Shape of the weights applied across the smoothing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightRamp {
    /// `exp(t)` for `t` evenly spaced over `[-1, 0]`
    Exponential,
    /// `1, 2, ..., n`
    Linear,
}

impl Default for WeightRamp {
    fn default() -> Self {
        Self::Exponential
    }
}

/// No-op filter that passes through values unchanged
#[derive(Debug, Default)]
pub struct NoFilter {
    last: Option<f64>,
}

impl SignalFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        self.last = Some(value);
        value
    }

    fn current(&self) -> Option<f64> {
        self.last
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create a signal filter for the given window size and ramp
///
/// A window of 1 cannot smooth anything, so it yields a [`NoFilter`].
///
/// # Errors
///
/// Returns an error if `window` is zero
pub fn create_filter(window: usize, ramp: WeightRamp) -> Result<Box<dyn SignalFilter>> {
    match window {
        0 => Err(crate::Error::InvalidInput("Filter window must be greater than 0".to_string())),
        1 => Ok(Box::new(NoFilter::default())),
        n => Ok(Box::new(WeightedMovingAverage::new(n, ramp))),
    }
}
