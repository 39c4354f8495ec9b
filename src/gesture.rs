//! Gesture vocabulary shared by the classifiers, the aggregator and the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Closed set of recognized gestures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GestureType {
    WinkLeft,
    WinkRight,
    BothBlink,
    TiltUp,
    TiltDown,
    TiltLeft,
    TiltRight,
}

impl GestureType {
    pub const COUNT: usize = 7;

    /// All gestures, in classifier evaluation order
    pub const ALL: [Self; Self::COUNT] = [
        Self::WinkLeft,
        Self::WinkRight,
        Self::BothBlink,
        Self::TiltUp,
        Self::TiltDown,
        Self::TiltLeft,
        Self::TiltRight,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WinkLeft => "wink_left",
            Self::WinkRight => "wink_right",
            Self::BothBlink => "both_blink",
            Self::TiltUp => "tilt_up",
            Self::TiltDown => "tilt_down",
            Self::TiltLeft => "tilt_left",
            Self::TiltRight => "tilt_right",
        }
    }

    /// True for head-tilt gestures
    pub const fn is_tilt(self) -> bool {
        matches!(self, Self::TiltUp | Self::TiltDown | Self::TiltLeft | Self::TiltRight)
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per gesture type, always fully populated
#[derive(Debug, Clone, PartialEq)]
pub struct GestureMap<T>([T; GestureType::COUNT]);

impl<T> GestureMap<T> {
    /// Build a map by evaluating `f` for every gesture type
    pub fn from_fn(mut f: impl FnMut(GestureType) -> T) -> Self {
        Self(GestureType::ALL.map(&mut f))
    }

    /// Iterate in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (GestureType, &T)> {
        GestureType::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Clone> GestureMap<T> {
    pub fn filled(value: T) -> Self {
        Self::from_fn(|_| value.clone())
    }
}

impl<T> Index<GestureType> for GestureMap<T> {
    type Output = T;

    fn index(&self, gesture: GestureType) -> &T {
        &self.0[gesture.index()]
    }
}

impl<T> IndexMut<GestureType> for GestureMap<T> {
    fn index_mut(&mut self, gesture: GestureType) -> &mut T {
        &mut self.0[gesture.index()]
    }
}

/// An accepted gesture
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GestureEvent {
    pub gesture: GestureType,
    /// Threshold margin mapped to `[0, 1]`; not a probability
    pub confidence: f64,
    /// Signed head angle in degrees, tilt gestures only
    pub angle: Option<f64>,
    /// Length of the completed hold in seconds, duration-gated gestures only
    pub hold_duration: Option<f64>,
    pub timestamp: f64,
}
