//! Facial landmark input and the geometry that turns it into raw per-frame signals.
//!
//! Landmark coordinates are normalized to `[0, 1]` relative to the frame
//! dimensions. Eye openness is the vertical eyelid gap; roll comes from the
//! eye-corner line and pitch from the nose position between the eye line and
//! the chin.

use crate::constants::{
    CHIN, EPSILON, LEFT_EYE_BOTTOM, LEFT_EYE_OUTER_CORNER, LEFT_EYE_TOP, NOSE_TIP, RIGHT_EYE_BOTTOM,
    RIGHT_EYE_INNER_CORNER, RIGHT_EYE_TOP,
};
use serde::{Deserialize, Serialize};

/// A single normalized landmark coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Normalized landmark set for one detected face
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LandmarkSet {
    points: Vec<Point>,
}

impl LandmarkSet {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Landmark at `index`, or `None` if missing or not finite
    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied().filter(|p| p.is_finite())
    }

    /// Overwrite a landmark, growing the set with origin points if needed
    pub fn set(&mut self, index: usize, point: Point) {
        if index >= self.points.len() {
            self.points.resize(index + 1, Point::new(0.0, 0.0));
        }
        self.points[index] = point;
    }
}

/// Per-frame landmark provider (camera + face-mesh model live behind this)
pub trait LandmarkSource {
    /// Landmarks for the next frame, or `None` when no face was detected
    fn next_landmarks(&mut self) -> Option<LandmarkSet>;
}

/// Head orientation in degrees, normalized to `[-180, 180]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadPose {
    /// Positive when the head leans toward the right of the image
    pub roll_deg: f64,
    /// Positive when the head tilts down
    pub pitch_deg: f64,
}

/// Unsmoothed measurements for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub left_eye_ratio: Option<f64>,
    #[serde(default)]
    pub right_eye_ratio: Option<f64>,
    /// `None` when the pose could not be computed this frame
    #[serde(default)]
    pub pose: Option<HeadPose>,
    /// Monotonic seconds
    pub timestamp: f64,
}

impl RawSample {
    /// Sample for a frame with no detected face
    pub const fn absent(timestamp: f64) -> Self {
        Self {
            left_eye_ratio: None,
            right_eye_ratio: None,
            pose: None,
            timestamp,
        }
    }

    /// Derive the raw signals from a landmark set
    pub fn from_landmarks(landmarks: Option<&LandmarkSet>, timestamp: f64, neutral_pitch_deg: f64) -> Self {
        let Some(landmarks) = landmarks else {
            return Self::absent(timestamp);
        };

        Self {
            left_eye_ratio: eye_ratio(landmarks, LEFT_EYE_TOP, LEFT_EYE_BOTTOM),
            right_eye_ratio: eye_ratio(landmarks, RIGHT_EYE_TOP, RIGHT_EYE_BOTTOM),
            pose: head_pose(landmarks, neutral_pitch_deg),
            timestamp,
        }
    }
}

/// Vertical eyelid separation; smaller means more closed
pub fn eye_ratio(landmarks: &LandmarkSet, top: usize, bottom: usize) -> Option<f64> {
    let top = landmarks.get(top)?;
    let bottom = landmarks.get(bottom)?;
    Some((top.y - bottom.y).abs())
}

/// Head roll and pitch from eye corners, nose tip and chin
///
/// Returns `None` when a required landmark is missing or the geometry is
/// degenerate (coincident eye corners or nose on the chin).
pub fn head_pose(landmarks: &LandmarkSet, neutral_pitch_deg: f64) -> Option<HeadPose> {
    let left_eye = landmarks.get(LEFT_EYE_OUTER_CORNER)?;
    let right_eye = landmarks.get(RIGHT_EYE_INNER_CORNER)?;
    let nose = landmarks.get(NOSE_TIP)?;
    let chin = landmarks.get(CHIN)?;

    let dx = right_eye.x - left_eye.x;
    let dy = right_eye.y - left_eye.y;
    if dx.hypot(dy) < EPSILON {
        return None;
    }
    let roll = dy.atan2(dx).to_degrees();

    let face_height = (chin.y - nose.y).abs();
    if face_height < EPSILON {
        return None;
    }
    let eye_center_y = (left_eye.y + right_eye.y) / 2.0;
    let nose_offset = nose.y - eye_center_y;
    let pitch = nose_offset.atan2(face_height).to_degrees() - neutral_pitch_deg;

    Some(HeadPose {
        roll_deg: normalize_angle(roll),
        pitch_deg: normalize_angle(pitch),
    })
}

/// Normalize an angle to the `[-180, 180]` range
pub fn normalize_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && angle > 0.0 {
        180.0
    } else {
        wrapped
    }
}
