//! Signal conditioning: per-scalar smoothing of raw eye-ratio and head-pose samples.

use crate::{
    config::ConditionerConfig,
    filters::{create_filter, SignalFilter},
    landmarks::{normalize_angle, RawSample},
    Result,
};
use log::debug;
use serde::Serialize;

/// Smoothed per-frame signal bundle consumed by the gesture classifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConditionedFrame {
    /// `None` when the left eye could not be measured this frame
    pub left_eye_ratio: Option<f64>,
    /// `None` when the right eye could not be measured this frame
    pub right_eye_ratio: Option<f64>,
    pub head_roll_deg: f64,
    pub head_pitch_deg: f64,
    pub timestamp: f64,
    /// False when the head pose could not be computed for this frame
    pub landmarks_valid: bool,
}

/// Smooth an angle without averaging across the ±180° seam
///
/// The new reading is unwrapped to lie within 180° of the previous smoothed
/// value, so the window stays continuous; only the output is wrapped.
fn smooth_angle(filter: &mut dyn SignalFilter, angle: f64) -> f64 {
    let unwrapped = match filter.current() {
        Some(previous) => previous + normalize_angle(angle - previous),
        None => normalize_angle(angle),
    };
    normalize_angle(filter.apply(unwrapped))
}

/// Smooths raw samples with one bounded window per tracked scalar
pub struct SignalConditioner {
    left_eye: Box<dyn SignalFilter>,
    right_eye: Box<dyn SignalFilter>,
    roll: Box<dyn SignalFilter>,
    pitch: Box<dyn SignalFilter>,
}

impl SignalConditioner {
    /// Create a conditioner from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a window size is zero
    pub fn new(config: &ConditionerConfig) -> Result<Self> {
        Ok(Self {
            left_eye: create_filter(config.eye_window, config.ramp)?,
            right_eye: create_filter(config.eye_window, config.ramp)?,
            roll: create_filter(config.pose_window, config.ramp)?,
            pitch: create_filter(config.pose_window, config.ramp)?,
        })
    }

    /// Push one raw sample and return the conditioned frame
    pub fn condition(&mut self, raw: &RawSample) -> ConditionedFrame {
        let left_eye_ratio = raw.left_eye_ratio.filter(|r| r.is_finite()).map(|r| self.left_eye.apply(r));
        let right_eye_ratio = raw.right_eye_ratio.filter(|r| r.is_finite()).map(|r| self.right_eye.apply(r));

        let pose = raw
            .pose
            .filter(|p| p.roll_deg.is_finite() && p.pitch_deg.is_finite());

        let (head_roll_deg, head_pitch_deg) = match pose {
            Some(pose) => (
                smooth_angle(self.roll.as_mut(), pose.roll_deg),
                smooth_angle(self.pitch.as_mut(), pose.pitch_deg),
            ),
            None => {
                debug!("Pose unavailable at {:.3}s, carrying previous pose forward", raw.timestamp);
                (
                    normalize_angle(self.roll.current().unwrap_or(0.0)),
                    normalize_angle(self.pitch.current().unwrap_or(0.0)),
                )
            }
        };

        ConditionedFrame {
            left_eye_ratio,
            right_eye_ratio,
            head_roll_deg,
            head_pitch_deg,
            timestamp: raw.timestamp,
            landmarks_valid: pose.is_some(),
        }
    }

    /// Drop all buffered history
    pub fn reset(&mut self) {
        self.left_eye.reset();
        self.right_eye.reset();
        self.roll.reset();
        self.pitch.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filters::WeightRamp, landmarks::HeadPose};

    fn conditioner(window: usize) -> SignalConditioner {
        SignalConditioner::new(&ConditionerConfig {
            eye_window: window,
            pose_window: window,
            ramp: WeightRamp::Linear,
        })
        .unwrap()
    }

    fn sample(left: f64, right: f64, roll: f64, pitch: f64, t: f64) -> RawSample {
        RawSample {
            left_eye_ratio: Some(left),
            right_eye_ratio: Some(right),
            pose: Some(HeadPose {
                roll_deg: roll,
                pitch_deg: pitch,
            }),
            timestamp: t,
        }
    }

    #[test]
    fn test_first_frame_is_raw() {
        let mut c = conditioner(5);
        let frame = c.condition(&sample(0.004, 0.012, -12.5, 7.0, 0.0));
        assert_eq!(frame.left_eye_ratio, Some(0.004));
        assert_eq!(frame.right_eye_ratio, Some(0.012));
        assert_eq!(frame.head_roll_deg, -12.5);
        assert_eq!(frame.head_pitch_deg, 7.0);
        assert!(frame.landmarks_valid);
    }

    #[test]
    fn test_second_frame_is_smoothed() {
        let mut c = conditioner(5);
        c.condition(&sample(0.0, 0.0, 0.0, 0.0, 0.0));
        let frame = c.condition(&sample(0.03, 0.03, 30.0, 30.0, 0.033));
        assert!((frame.head_pitch_deg - 20.0).abs() < 1e-9);
        assert!((frame.left_eye_ratio.unwrap() - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_pose_failure_carries_stale_pose() {
        let mut c = conditioner(3);
        let first = c.condition(&sample(0.01, 0.01, 10.0, -5.0, 0.0));

        let raw = RawSample {
            left_eye_ratio: Some(0.002),
            right_eye_ratio: Some(0.002),
            pose: None,
            timestamp: 0.033,
        };
        let frame = c.condition(&raw);
        assert!(!frame.landmarks_valid);
        assert_eq!(frame.head_roll_deg, first.head_roll_deg);
        assert_eq!(frame.head_pitch_deg, first.head_pitch_deg);
        // Eye buffers still advanced
        assert!(frame.left_eye_ratio.unwrap() < 0.01);

        // Pose buffer was not updated by the failed frame
        let next = c.condition(&sample(0.01, 0.01, 40.0, -5.0, 0.066));
        assert!((next.head_roll_deg - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_face() {
        let mut c = conditioner(3);
        let frame = c.condition(&RawSample::absent(1.0));
        assert!(!frame.landmarks_valid);
        assert_eq!(frame.left_eye_ratio, None);
        assert_eq!(frame.head_roll_deg, 0.0);
    }

    #[test]
    fn test_non_finite_values_are_ignored() {
        let mut c = conditioner(3);
        c.condition(&sample(0.01, 0.01, 5.0, 5.0, 0.0));
        let frame = c.condition(&sample(f64::NAN, 0.01, f64::INFINITY, 5.0, 0.1));
        assert_eq!(frame.left_eye_ratio, None);
        assert!(!frame.landmarks_valid);
        assert_eq!(frame.head_roll_deg, 5.0);
    }

    #[test]
    fn test_pose_smoothing_across_the_seam() {
        let mut c = conditioner(3);
        c.condition(&sample(0.01, 0.01, 179.0, -179.0, 0.0));
        let frame = c.condition(&sample(0.01, 0.01, -179.0, 179.0, 0.033));
        // (179 + 2 * 181) / 3 wraps to about -179.67
        assert!((frame.head_roll_deg + 179.0 + 2.0 / 3.0).abs() < 1e-9);
        assert!((frame.head_pitch_deg - 179.0 - 2.0 / 3.0).abs() < 1e-9);

        let next = c.condition(&sample(0.01, 0.01, -179.0, 179.0, 0.066));
        assert!(next.head_roll_deg.abs() > 179.0);
        assert!(next.head_pitch_deg.abs() > 179.0);
    }

    #[test]
    fn test_window_of_one_never_smooths() {
        let mut c = conditioner(1);
        c.condition(&sample(0.01, 0.01, 0.0, 0.0, 0.0));
        let frame = c.condition(&sample(0.02, 0.02, 20.0, 20.0, 0.1));
        assert_eq!(frame.head_roll_deg, 20.0);
        assert_eq!(frame.left_eye_ratio, Some(0.02));
    }

    #[test]
    fn test_reset() {
        let mut c = conditioner(3);
        c.condition(&sample(0.01, 0.01, 10.0, 10.0, 0.0));
        c.reset();
        let frame = c.condition(&RawSample::absent(0.1));
        assert_eq!(frame.head_roll_deg, 0.0);
    }
}
