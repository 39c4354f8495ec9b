use super::{SignalFilter, WeightRamp};
use crate::ring_buffer::RingBuffer;

/// Moving average whose weights increase monotonically toward the newest sample
pub struct WeightedMovingAverage {
    ramp: WeightRamp,
    buffer: RingBuffer<f64>,
    last_output: Option<f64>,
}

impl WeightedMovingAverage {
    /// # Panics
    ///
    /// Panics if `window_size` is zero
    pub fn new(window_size: usize, ramp: WeightRamp) -> Self {
        assert!(window_size > 0, "Window size must be greater than 0");
        Self {
            ramp,
            buffer: RingBuffer::new(window_size),
            last_output: None,
        }
    }

    /// Normalized weights for `n` samples, oldest first
    #[allow(clippy::cast_precision_loss)] // n <= 15
    pub fn weights(ramp: WeightRamp, n: usize) -> Vec<f64> {
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![1.0];
        }

        let raw: Vec<f64> = match ramp {
            WeightRamp::Exponential => (0..n)
                .map(|i| (-1.0 + i as f64 / (n - 1) as f64).exp())
                .collect(),
            WeightRamp::Linear => (1..=n).map(|i| i as f64).collect(),
        };

        let total: f64 = raw.iter().sum();
        raw.into_iter().map(|w| w / total).collect()
    }
}

impl SignalFilter for WeightedMovingAverage {
    fn apply(&mut self, value: f64) -> f64 {
        self.buffer.push(value);

        let output = if self.buffer.len() < 2 {
            value
        } else {
            Self::weights(self.ramp, self.buffer.len())
                .iter()
                .zip(self.buffer.iter())
                .map(|(w, v)| w * v)
                .sum()
        };

        self.last_output = Some(output);
        output
    }

    fn current(&self) -> Option<f64> {
        self.last_output
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.last_output = None;
    }

    fn name(&self) -> &str {
        "WeightedMovingAverage"
    }
}
