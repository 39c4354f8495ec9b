//! Configuration management for the gesture engine

use crate::{
    classifier::{ClassifierConfig, Eye, Gate, TiltAxis, TiltDirection, Trigger},
    constants::*,
    filters::WeightRamp,
    gesture::{GestureMap, GestureType},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Signal smoothing configuration
    pub conditioner: ConditionerConfig,

    /// Landmark geometry configuration
    pub geometry: GeometryConfig,

    /// Gesture thresholds, cooldowns and hold windows
    pub gestures: GestureConfig,

    /// Action dispatch configuration
    pub dispatch: DispatchConfig,
}

/// Smoothing window configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionerConfig {
    /// Window size for the two eye ratios (1-15)
    pub eye_window: usize,

    /// Window size for head roll and pitch (1-15)
    pub pose_window: usize,

    /// Weight ramp across the window
    pub ramp: WeightRamp,
}

/// Geometry helper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Pitch measured for a frontal face, subtracted from every reading
    pub neutral_pitch_deg: f64,
}

/// Cooldown and hold-duration window for one gesture family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Minimum seconds between two accepted events of the same type
    pub cooldown_s: f64,

    /// Shortest accepted hold in seconds (ignored for tilts)
    #[serde(default)]
    pub min_hold_s: f64,

    /// Longest accepted hold in seconds (ignored for tilts)
    #[serde(default)]
    pub max_hold_s: f64,
}

/// Gesture classification parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Eye ratio below which a single eye counts as closed
    pub wink_threshold: f64,

    /// Eye ratio below which both eyes count as closed
    pub blink_threshold: f64,

    /// The other eye must stay above `wink_threshold * open_eye_multiplier`
    pub open_eye_multiplier: f64,

    /// Head angle in degrees beyond which a tilt fires
    pub tilt_threshold_deg: f64,

    /// Angle mapped to full confidence
    pub tilt_full_scale_deg: f64,

    /// Samples kept per classifier for hold-duration measurement (2-64)
    pub history_capacity: usize,

    /// Timing for left and right winks
    pub wink: TimingConfig,

    /// Timing for the both-eyes blink
    pub blink: TimingConfig,

    /// Cooldown for head tilts
    pub tilt: TimingConfig,
}

/// How dispatched commands are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Dispatch synchronously within the frame
    Inline,
    /// Dispatch on a worker thread fed by a bounded queue
    Worker,
}

/// Action dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Injection backends, tried in order (xdotool, x11, log)
    pub backends: Vec<String>,

    /// Program used by the command backend
    pub command: String,

    /// Per-call timeout in milliseconds
    pub backend_timeout_ms: u64,

    /// Wheel steps per scroll gesture
    pub scroll_steps: u32,

    /// Inline or worker dispatch
    pub mode: DispatchMode,

    /// Bounded queue length for worker dispatch
    pub queue_capacity: usize,
}

impl Default for ConditionerConfig {
    fn default() -> Self {
        Self {
            eye_window: DEFAULT_EYE_WINDOW,
            pose_window: DEFAULT_POSE_WINDOW,
            ramp: WeightRamp::Exponential,
        }
    }
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            neutral_pitch_deg: DEFAULT_NEUTRAL_PITCH_DEG,
        }
    }
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            wink_threshold: DEFAULT_WINK_THRESHOLD,
            blink_threshold: DEFAULT_BLINK_THRESHOLD,
            open_eye_multiplier: DEFAULT_OPEN_EYE_MULTIPLIER,
            tilt_threshold_deg: DEFAULT_TILT_THRESHOLD_DEG,
            tilt_full_scale_deg: DEFAULT_TILT_FULL_SCALE_DEG,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            wink: TimingConfig {
                cooldown_s: DEFAULT_WINK_COOLDOWN,
                min_hold_s: DEFAULT_WINK_MIN_HOLD,
                max_hold_s: DEFAULT_WINK_MAX_HOLD,
            },
            blink: TimingConfig {
                cooldown_s: DEFAULT_BLINK_COOLDOWN,
                min_hold_s: DEFAULT_BLINK_MIN_HOLD,
                max_hold_s: DEFAULT_BLINK_MAX_HOLD,
            },
            tilt: TimingConfig {
                cooldown_s: DEFAULT_TILT_COOLDOWN,
                min_hold_s: 0.0,
                max_hold_s: 0.0,
            },
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backends: vec!["xdotool".to_string(), "x11".to_string()],
            command: "xdotool".to_string(),
            backend_timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            scroll_steps: DEFAULT_SCROLL_STEPS,
            mode: DispatchMode::Inline,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl DispatchConfig {
    pub const fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }
}

impl GestureConfig {
    /// Build the per-gesture classifier configuration
    pub fn classifier_configs(&self) -> GestureMap<ClassifierConfig> {
        let hold = |timing: &TimingConfig| Gate::HoldWindow {
            min_hold: timing.min_hold_s,
            max_hold: timing.max_hold_s,
        };
        let tilt = |axis, direction| Trigger::Tilt {
            axis,
            direction,
            threshold: self.tilt_threshold_deg,
            full_scale: self.tilt_full_scale_deg,
        };
        let wink = |eye| Trigger::EyeClosure {
            eye,
            threshold: self.wink_threshold,
            open_above: self.wink_threshold * self.open_eye_multiplier,
        };

        GestureMap::from_fn(|gesture| {
            let (trigger, gate, cooldown) = match gesture {
                GestureType::WinkLeft => (wink(Eye::Left), hold(&self.wink), self.wink.cooldown_s),
                GestureType::WinkRight => (wink(Eye::Right), hold(&self.wink), self.wink.cooldown_s),
                GestureType::BothBlink => (
                    Trigger::BothEyesClosed {
                        threshold: self.blink_threshold,
                    },
                    hold(&self.blink),
                    self.blink.cooldown_s,
                ),
                GestureType::TiltUp => (
                    tilt(TiltAxis::Pitch, TiltDirection::Negative),
                    Gate::Instant,
                    self.tilt.cooldown_s,
                ),
                GestureType::TiltDown => (
                    tilt(TiltAxis::Pitch, TiltDirection::Positive),
                    Gate::Instant,
                    self.tilt.cooldown_s,
                ),
                GestureType::TiltLeft => (
                    tilt(TiltAxis::Roll, TiltDirection::Negative),
                    Gate::Instant,
                    self.tilt.cooldown_s,
                ),
                GestureType::TiltRight => (
                    tilt(TiltAxis::Roll, TiltDirection::Positive),
                    Gate::Instant,
                    self.tilt.cooldown_s,
                ),
            };
            ClassifierConfig {
                gesture,
                trigger,
                gate,
                cooldown,
            }
        })
    }
}

fn check_cooldown(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::ConfigError(format!(
            "{name} cooldown must be a non-negative number of seconds, got {value}"
        )));
    }
    Ok(())
}

fn check_hold_window(name: &str, timing: &TimingConfig) -> Result<()> {
    if !timing.min_hold_s.is_finite() || !timing.max_hold_s.is_finite() || timing.min_hold_s < 0.0 {
        return Err(Error::ConfigError(format!(
            "{name} hold window must be finite and non-negative"
        )));
    }
    if timing.min_hold_s > timing.max_hold_s {
        return Err(Error::ConfigError(format!(
            "{name} min_hold_s ({}) must not exceed max_hold_s ({})",
            timing.min_hold_s, timing.max_hold_s
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::ConfigError(format!("{name} must be positive, got {value}")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Validate smoothing windows
        for (name, window) in [
            ("Eye", self.conditioner.eye_window),
            ("Pose", self.conditioner.pose_window),
        ] {
            if !(1..=MAX_SMOOTHING_WINDOW).contains(&window) {
                return Err(Error::ConfigError(format!(
                    "{name} window size must be between 1 and {MAX_SMOOTHING_WINDOW}, got {window}"
                )));
            }
        }

        if !self.geometry.neutral_pitch_deg.is_finite() {
            return Err(Error::ConfigError("Neutral pitch must be finite".to_string()));
        }

        // Validate thresholds
        let gestures = &self.gestures;
        check_positive("Wink threshold", gestures.wink_threshold)?;
        check_positive("Blink threshold", gestures.blink_threshold)?;
        check_positive("Tilt threshold", gestures.tilt_threshold_deg)?;
        check_positive("Tilt full scale", gestures.tilt_full_scale_deg)?;
        if !gestures.open_eye_multiplier.is_finite() || gestures.open_eye_multiplier < 1.0 {
            return Err(Error::ConfigError(
                "Open eye multiplier must be at least 1.0".to_string(),
            ));
        }
        if !(MIN_HISTORY_CAPACITY..=MAX_HISTORY_CAPACITY).contains(&gestures.history_capacity) {
            return Err(Error::ConfigError(format!(
                "History capacity must be between {MIN_HISTORY_CAPACITY} and {MAX_HISTORY_CAPACITY}"
            )));
        }

        // Validate timing
        check_cooldown("Wink", gestures.wink.cooldown_s)?;
        check_cooldown("Blink", gestures.blink.cooldown_s)?;
        check_cooldown("Tilt", gestures.tilt.cooldown_s)?;
        check_hold_window("Wink", &gestures.wink)?;
        check_hold_window("Blink", &gestures.blink)?;

        // Validate dispatch settings
        let dispatch = &self.dispatch;
        if dispatch.backends.is_empty() {
            return Err(Error::ConfigError("At least one input backend is required".to_string()));
        }
        for name in &dispatch.backends {
            if !crate::backend::BACKEND_NAMES.contains(&name.to_lowercase().as_str()) {
                return Err(Error::ConfigError(format!("Unknown input backend: {name}")));
            }
        }
        if dispatch.backend_timeout_ms == 0 {
            return Err(Error::ConfigError("Backend timeout must be greater than 0".to_string()));
        }
        if dispatch.scroll_steps == 0 {
            return Err(Error::ConfigError("Scroll steps must be greater than 0".to_string()));
        }
        if dispatch.mode == DispatchMode::Worker && dispatch.queue_capacity == 0 {
            return Err(Error::ConfigError("Queue capacity must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Face Gesture Control Configuration

# Signal smoothing
conditioner:
  eye_window: 5
  pose_window: 3
  ramp: exponential

# Landmark geometry
geometry:
  neutral_pitch_deg: 30.0

# Gesture classification
gestures:
  wink_threshold: 0.006
  blink_threshold: 0.008
  open_eye_multiplier: 1.5
  tilt_threshold_deg: 25.0
  tilt_full_scale_deg: 30.0
  history_capacity: 32
  wink:
    cooldown_s: 0.8
    min_hold_s: 0.2
    max_hold_s: 0.6
  blink:
    cooldown_s: 1.0
    min_hold_s: 0.3
    max_hold_s: 0.8
  tilt:
    cooldown_s: 1.0

# Action dispatch
dispatch:
  backends: ["xdotool", "x11"]
  command: "xdotool"
  backend_timeout_ms: 500
  scroll_steps: 3
  mode: inline
  queue_capacity: 16
"#;
