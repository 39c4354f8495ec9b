//! Per-gesture state machines.
//!
//! Every gesture type gets its own [`GestureClassifier`]. All of them share one
//! evaluation contract and differ only in configuration:
//!
//! - a [`Trigger`] decides whether the gesture predicate holds for a frame and
//!   how far past the threshold the signal is;
//! - a [`Gate`] decides when a satisfied predicate is accepted. `Instant` fires
//!   on the first frame past the threshold. `HoldWindow` measures how long the
//!   predicate held by scanning the sample history backward and judges the
//!   hold once it ends, rejecting both reflexive blinks and long closures.
//!
//! A per-type cooldown applies to both gates.

use crate::{conditioner::ConditionedFrame, gesture::{GestureEvent, GestureType}, ring_buffer::RingBuffer};
use log::debug;

/// Which eye a wink closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Left,
    Right,
}

/// Head angle compared by a tilt trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltAxis {
    Roll,
    Pitch,
}

/// Sign of the angle that satisfies a tilt trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltDirection {
    /// `angle > threshold`
    Positive,
    /// `angle < -threshold`
    Negative,
}

/// Per-frame predicate of a classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// One eye below `threshold` while the other stays above `open_above`
    EyeClosure { eye: Eye, threshold: f64, open_above: f64 },
    /// Both eyes below `threshold`
    BothEyesClosed { threshold: f64 },
    /// Signed head angle beyond `threshold`; `full_scale` maps to confidence 1.0
    Tilt {
        axis: TiltAxis,
        direction: TiltDirection,
        threshold: f64,
        full_scale: f64,
    },
}

/// Acceptance rule applied once the predicate holds
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gate {
    Instant,
    HoldWindow { min_hold: f64, max_hold: f64 },
}

/// Immutable configuration of one classifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub gesture: GestureType,
    pub trigger: Trigger,
    pub gate: Gate,
    /// Minimum seconds between two accepted events
    pub cooldown: f64,
}

fn closure_margin(ratio: f64, threshold: f64) -> f64 {
    ((threshold - ratio) / threshold).clamp(0.0, 1.0)
}

impl Trigger {
    /// Confidence in `[0, 1]` if the predicate holds for `frame`
    ///
    /// Missing or non-finite signals never satisfy a predicate.
    pub fn evaluate(&self, frame: &ConditionedFrame) -> Option<f64> {
        match *self {
            Self::EyeClosure {
                eye,
                threshold,
                open_above,
            } => {
                let (closed, other) = match eye {
                    Eye::Left => (frame.left_eye_ratio?, frame.right_eye_ratio?),
                    Eye::Right => (frame.right_eye_ratio?, frame.left_eye_ratio?),
                };
                if !closed.is_finite() || !other.is_finite() {
                    return None;
                }
                (closed < threshold && other > open_above).then(|| closure_margin(closed, threshold))
            }
            Self::BothEyesClosed { threshold } => {
                let left = frame.left_eye_ratio.filter(|r| r.is_finite())?;
                let right = frame.right_eye_ratio.filter(|r| r.is_finite())?;
                (left < threshold && right < threshold)
                    .then(|| closure_margin(left, threshold).min(closure_margin(right, threshold)))
            }
            Self::Tilt {
                direction,
                threshold,
                full_scale,
                ..
            } => {
                let angle = self.angle(frame)?;
                let past = match direction {
                    TiltDirection::Positive => angle > threshold,
                    TiltDirection::Negative => angle < -threshold,
                };
                past.then(|| (angle.abs() / full_scale).min(1.0))
            }
        }
    }

    /// Whether `frame` ends a run because the gesture was let go
    ///
    /// A wink is released only when the winking eye reopens while the other eye
    /// is still open. A run that ends because the other eye closed, or because a
    /// signal went missing, is not a release.
    pub fn released(&self, frame: &ConditionedFrame) -> bool {
        match *self {
            Self::EyeClosure { eye, threshold, .. } => {
                let (closed, other) = match eye {
                    Eye::Left => (frame.left_eye_ratio, frame.right_eye_ratio),
                    Eye::Right => (frame.right_eye_ratio, frame.left_eye_ratio),
                };
                match (closed, other) {
                    (Some(closed), Some(other)) => closed >= threshold && other >= threshold,
                    _ => false,
                }
            }
            Self::BothEyesClosed { threshold } => match (frame.left_eye_ratio, frame.right_eye_ratio) {
                (Some(left), Some(right)) if left.is_finite() && right.is_finite() => {
                    left >= threshold || right >= threshold
                }
                _ => false,
            },
            Self::Tilt { .. } => true,
        }
    }

    /// Signed angle read by a tilt trigger
    pub fn angle(&self, frame: &ConditionedFrame) -> Option<f64> {
        match *self {
            Self::Tilt { axis, .. } => {
                let angle = match axis {
                    TiltAxis::Roll => frame.head_roll_deg,
                    TiltAxis::Pitch => frame.head_pitch_deg,
                };
                angle.is_finite().then_some(angle)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HoldSample {
    active: bool,
    confidence: f64,
    timestamp: f64,
}

struct CompletedHold {
    duration: f64,
    confidence: f64,
    /// The run reaches past the oldest retained sample
    truncated: bool,
}

/// State machine for one gesture type
pub struct GestureClassifier {
    config: ClassifierConfig,
    history: RingBuffer<HoldSample>,
    last_fire_time: f64,
}

impl GestureClassifier {
    /// # Panics
    ///
    /// Panics if `history_capacity` is zero
    pub fn new(config: ClassifierConfig, history_capacity: usize) -> Self {
        Self {
            config,
            history: RingBuffer::new(history_capacity),
            last_fire_time: f64::NEG_INFINITY,
        }
    }

    pub const fn gesture(&self) -> GestureType {
        self.config.gesture
    }

    pub const fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Time of the last accepted event, if any
    pub fn last_fire_time(&self) -> Option<f64> {
        self.last_fire_time.is_finite().then_some(self.last_fire_time)
    }

    /// Evaluate one frame with the configured cooldown
    pub fn evaluate(&mut self, frame: &ConditionedFrame, now: f64) -> Option<GestureEvent> {
        self.evaluate_with_cooldown(frame, now, self.config.cooldown)
    }

    /// Evaluate one frame, overriding the cooldown (`f64::INFINITY` silences the classifier)
    pub fn evaluate_with_cooldown(&mut self, frame: &ConditionedFrame, now: f64, cooldown: f64) -> Option<GestureEvent> {
        if !frame.landmarks_valid {
            self.history.clear();
            return None;
        }

        let reading = self.config.trigger.evaluate(frame);
        self.history.push(HoldSample {
            active: reading.is_some(),
            confidence: reading.unwrap_or(0.0),
            timestamp: now,
        });

        match self.config.gate {
            Gate::Instant => {
                let confidence = reading?;
                if !self.cooldown_elapsed(now, cooldown) {
                    return None;
                }
                let angle = self.config.trigger.angle(frame);
                Some(self.fire(now, confidence, angle, None))
            }
            Gate::HoldWindow { min_hold, max_hold } => {
                if reading.is_some() {
                    return None;
                }
                let hold = self.completed_hold(now)?;
                if !self.config.trigger.released(frame) {
                    debug!("{} run ended without a release", self.config.gesture);
                    return None;
                }
                if !self.cooldown_elapsed(now, cooldown) {
                    debug!("{} hold ignored during cooldown", self.config.gesture);
                    return None;
                }
                if hold.truncated || hold.duration < min_hold || hold.duration > max_hold {
                    debug!(
                        "{} hold of {:.3}s rejected (window {:.2}-{:.2}s{})",
                        self.config.gesture,
                        hold.duration,
                        min_hold,
                        max_hold,
                        if hold.truncated { ", exceeds history" } else { "" }
                    );
                    return None;
                }
                Some(self.fire(now, hold.confidence, None, Some(hold.duration)))
            }
        }
    }

    /// Forget history and cooldown
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_fire_time = f64::NEG_INFINITY;
    }

    fn cooldown_elapsed(&self, now: f64, cooldown: f64) -> bool {
        now - self.last_fire_time > cooldown
    }

    /// The hold that ended with the newest (inactive) sample, if any
    fn completed_hold(&self, now: f64) -> Option<CompletedHold> {
        let mut onset = None;
        let mut confidence: f64 = 0.0;
        let mut reached_oldest = false;

        for (index, sample) in self.history.iter().enumerate().rev().skip(1) {
            if !sample.active {
                break;
            }
            onset = Some(sample.timestamp);
            confidence = confidence.max(sample.confidence);
            reached_oldest = index == 0;
        }

        onset.map(|onset| CompletedHold {
            duration: now - onset,
            confidence,
            truncated: reached_oldest && self.history.is_full(),
        })
    }

    fn fire(&mut self, now: f64, confidence: f64, angle: Option<f64>, hold_duration: Option<f64>) -> GestureEvent {
        self.last_fire_time = now;
        debug!("{} accepted at {:.3}s (confidence {:.2})", self.config.gesture, now, confidence);
        GestureEvent {
            gesture: self.config.gesture,
            confidence: confidence.clamp(0.0, 1.0),
            angle,
            hold_duration,
            timestamp: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPEN: f64 = 0.02;
    const CLOSED: f64 = 0.003;

    fn frame(left: f64, right: f64, roll: f64, pitch: f64, t: f64) -> ConditionedFrame {
        ConditionedFrame {
            left_eye_ratio: Some(left),
            right_eye_ratio: Some(right),
            head_roll_deg: roll,
            head_pitch_deg: pitch,
            timestamp: t,
            landmarks_valid: true,
        }
    }

    fn wink_left(capacity: usize) -> GestureClassifier {
        GestureClassifier::new(
            ClassifierConfig {
                gesture: GestureType::WinkLeft,
                trigger: Trigger::EyeClosure {
                    eye: Eye::Left,
                    threshold: 0.006,
                    open_above: 0.009,
                },
                gate: Gate::HoldWindow {
                    min_hold: 0.2,
                    max_hold: 0.6,
                },
                cooldown: 0.8,
            },
            capacity,
        )
    }

    fn tilt_down() -> GestureClassifier {
        GestureClassifier::new(
            ClassifierConfig {
                gesture: GestureType::TiltDown,
                trigger: Trigger::Tilt {
                    axis: TiltAxis::Pitch,
                    direction: TiltDirection::Positive,
                    threshold: 25.0,
                    full_scale: 30.0,
                },
                gate: Gate::Instant,
                cooldown: 1.0,
            },
            8,
        )
    }

    /// Close the left eye for `closed_frames` frames of 50 ms, then open it
    fn run_wink(classifier: &mut GestureClassifier, start: f64, closed_frames: usize) -> Vec<GestureEvent> {
        let mut events = Vec::new();
        let mut t = start;
        for _ in 0..closed_frames {
            events.extend(classifier.evaluate(&frame(CLOSED, OPEN, 0.0, 0.0, t), t));
            t += 0.05;
        }
        events.extend(classifier.evaluate(&frame(OPEN, OPEN, 0.0, 0.0, t), t));
        events
    }

    #[test]
    fn test_deliberate_wink_fires_on_release() {
        let mut classifier = wink_left(24);
        // closed 0.00..0.30, released at 0.35
        let events = run_wink(&mut classifier, 0.0, 7);
        assert_eq!(events.len(), 1);
        let event = events[0];
        assert_eq!(event.gesture, GestureType::WinkLeft);
        assert!((event.hold_duration.unwrap() - 0.35).abs() < 1e-9);
        assert!((event.confidence - 0.5).abs() < 1e-9);
        assert_eq!(event.angle, None);
        assert_eq!(classifier.last_fire_time(), Some(event.timestamp));
    }

    #[test]
    fn test_brief_blink_rejected() {
        let mut classifier = wink_left(24);
        assert!(run_wink(&mut classifier, 0.0, 1).is_empty());
        assert_eq!(classifier.last_fire_time(), None);
    }

    #[test]
    fn test_long_closure_rejected() {
        let mut classifier = wink_left(24);
        // closed for 0.9 s
        assert!(run_wink(&mut classifier, 0.0, 18).is_empty());
    }

    #[test]
    fn test_closure_longer_than_history_rejected() {
        let mut classifier = wink_left(4);
        assert!(run_wink(&mut classifier, 0.0, 7).is_empty());
    }

    #[test]
    fn test_no_event_while_holding() {
        let mut classifier = wink_left(24);
        for i in 0..10 {
            let t = f64::from(i) * 0.05;
            assert!(classifier.evaluate(&frame(CLOSED, OPEN, 0.0, 0.0, t), t).is_none());
        }
    }

    #[test]
    fn test_wink_requires_other_eye_open() {
        let mut classifier = wink_left(24);
        let mut t = 0.0;
        for _ in 0..7 {
            assert!(classifier.evaluate(&frame(CLOSED, CLOSED, 0.0, 0.0, t), t).is_none());
            t += 0.05;
        }
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, 0.0, t), t).is_none());
    }

    #[test]
    fn test_wink_ending_in_both_closed_rejected() {
        let mut classifier = wink_left(24);
        let mut t = 0.0;
        for _ in 0..7 {
            assert!(classifier.evaluate(&frame(CLOSED, OPEN, 0.0, 0.0, t), t).is_none());
            t += 0.05;
        }
        assert!(classifier.evaluate(&frame(CLOSED, CLOSED, 0.0, 0.0, t), t).is_none());
        t += 0.05;
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, 0.0, t), t).is_none());
        assert_eq!(classifier.last_fire_time(), None);
    }

    #[test]
    fn test_wink_ending_in_squint_rejected() {
        let mut classifier = wink_left(24);
        let mut t = 0.0;
        for _ in 0..7 {
            classifier.evaluate(&frame(CLOSED, OPEN, 0.0, 0.0, t), t);
            t += 0.05;
        }
        // other eye drops below the open level while the left eye stays shut
        assert!(classifier.evaluate(&frame(CLOSED, 0.008, 0.0, 0.0, t), t).is_none());
    }

    #[test]
    fn test_release_requires_both_signals() {
        let trigger = wink_left(4).config().trigger;
        assert!(trigger.released(&frame(OPEN, OPEN, 0.0, 0.0, 0.0)));
        assert!(!trigger.released(&frame(OPEN, CLOSED, 0.0, 0.0, 0.0)));
        assert!(!trigger.released(&frame(CLOSED, CLOSED, 0.0, 0.0, 0.0)));
        let mut missing = frame(OPEN, OPEN, 0.0, 0.0, 0.0);
        missing.right_eye_ratio = None;
        assert!(!trigger.released(&missing));

        let both = Trigger::BothEyesClosed { threshold: 0.008 };
        assert!(both.released(&frame(OPEN, CLOSED, 0.0, 0.0, 0.0)));
        assert!(!both.released(&missing_left()));
    }

    fn missing_left() -> ConditionedFrame {
        let mut partial = frame(CLOSED, OPEN, 0.0, 0.0, 0.0);
        partial.left_eye_ratio = None;
        partial
    }

    #[test]
    fn test_wink_cooldown() {
        let mut classifier = wink_left(24);
        assert_eq!(run_wink(&mut classifier, 0.0, 7).len(), 1);
        // second wink released at 0.75 s, inside the 0.8 s cooldown
        assert!(run_wink(&mut classifier, 0.4, 7).is_empty());
        // released at 1.55 s
        assert_eq!(run_wink(&mut classifier, 1.2, 7).len(), 1);
    }

    #[test]
    fn test_invalid_frame_breaks_hold() {
        let mut classifier = wink_left(24);
        let mut t = 0.0;
        for _ in 0..3 {
            classifier.evaluate(&frame(CLOSED, OPEN, 0.0, 0.0, t), t);
            t += 0.05;
        }
        let mut lost = frame(CLOSED, OPEN, 0.0, 0.0, t);
        lost.landmarks_valid = false;
        assert!(classifier.evaluate(&lost, t).is_none());
        t += 0.05;
        // a single closed frame after the gap is too short on its own
        classifier.evaluate(&frame(CLOSED, OPEN, 0.0, 0.0, t), t);
        t += 0.05;
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, 0.0, t), t).is_none());
    }

    #[test]
    fn test_tilt_fires_immediately() {
        let mut classifier = tilt_down();
        let event = classifier.evaluate(&frame(OPEN, OPEN, 0.0, 30.0, 0.0), 0.0).unwrap();
        assert_eq!(event.gesture, GestureType::TiltDown);
        assert_eq!(event.confidence, 1.0);
        assert_eq!(event.angle, Some(30.0));
        assert_eq!(event.hold_duration, None);
    }

    #[test]
    fn test_tilt_sign_is_respected() {
        let mut classifier = tilt_down();
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, -30.0, 0.0), 0.0).is_none());
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, 24.9, 0.1), 0.1).is_none());
        let event = classifier.evaluate(&frame(OPEN, OPEN, 0.0, 27.0, 0.2), 0.2).unwrap();
        assert!((event.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_tilt_cooldown_with_continuous_predicate() {
        let mut classifier = tilt_down();
        let fired: Vec<f64> = (0..8)
            .map(|i| f64::from(i) * 0.25)
            .filter(|&t| classifier.evaluate(&frame(OPEN, OPEN, 0.0, 30.0, t), t).is_some())
            .collect();
        assert_eq!(fired, vec![0.0, 1.25]);
    }

    #[test]
    fn test_infinite_cooldown_silences() {
        let mut classifier = tilt_down();
        assert!(classifier
            .evaluate_with_cooldown(&frame(OPEN, OPEN, 0.0, 40.0, 0.0), 0.0, f64::INFINITY)
            .is_none());
    }

    #[test]
    fn test_missing_signal_is_predicate_false() {
        let mut classifier = tilt_down();
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, f64::NAN, 0.0), 0.0).is_none());

        let trigger = Trigger::BothEyesClosed { threshold: 0.008 };
        let mut no_eyes = frame(CLOSED, CLOSED, 0.0, 0.0, 0.0);
        no_eyes.left_eye_ratio = None;
        assert_eq!(trigger.evaluate(&no_eyes), None);
    }

    #[test]
    fn test_reset() {
        let mut classifier = tilt_down();
        classifier.evaluate(&frame(OPEN, OPEN, 0.0, 30.0, 0.0), 0.0);
        classifier.reset();
        assert_eq!(classifier.last_fire_time(), None);
        assert!(classifier.evaluate(&frame(OPEN, OPEN, 0.0, 30.0, 0.1), 0.1).is_some());
    }
}
