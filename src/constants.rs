//! Constants used throughout the application

/// Eyelid landmarks (`MediaPipe` face mesh indices)
pub const LEFT_EYE_TOP: usize = 159;
pub const LEFT_EYE_BOTTOM: usize = 145;
pub const RIGHT_EYE_TOP: usize = 386;
pub const RIGHT_EYE_BOTTOM: usize = 374;

/// Head pose landmarks
pub const LEFT_EYE_OUTER_CORNER: usize = 33;
pub const RIGHT_EYE_INNER_CORNER: usize = 362;
pub const NOSE_TIP: usize = 1;
pub const CHIN: usize = 175;

/// Default pitch of a frontal face as measured by the nose/chin geometry
pub const DEFAULT_NEUTRAL_PITCH_DEG: f64 = 30.0;

/// Default smoothing windows
pub const DEFAULT_EYE_WINDOW: usize = 5;
pub const DEFAULT_POSE_WINDOW: usize = 3;
pub const MAX_SMOOTHING_WINDOW: usize = 15;

/// Default classifier history capacity (~1 s at 30 fps)
pub const DEFAULT_HISTORY_CAPACITY: usize = 32;
pub const MIN_HISTORY_CAPACITY: usize = 2;
pub const MAX_HISTORY_CAPACITY: usize = 64;

/// Default eye thresholds (vertical eyelid gap in normalized coordinates)
pub const DEFAULT_WINK_THRESHOLD: f64 = 0.006;
pub const DEFAULT_BLINK_THRESHOLD: f64 = 0.008;
pub const DEFAULT_OPEN_EYE_MULTIPLIER: f64 = 1.5;

/// Default head tilt threshold and confidence full scale (degrees)
pub const DEFAULT_TILT_THRESHOLD_DEG: f64 = 25.0;
pub const DEFAULT_TILT_FULL_SCALE_DEG: f64 = 30.0;

/// Default cooldowns (seconds)
pub const DEFAULT_WINK_COOLDOWN: f64 = 0.8;
pub const DEFAULT_BLINK_COOLDOWN: f64 = 1.0;
pub const DEFAULT_TILT_COOLDOWN: f64 = 1.0;

/// Default hold-duration windows (seconds)
pub const DEFAULT_WINK_MIN_HOLD: f64 = 0.2;
pub const DEFAULT_WINK_MAX_HOLD: f64 = 0.6;
pub const DEFAULT_BLINK_MIN_HOLD: f64 = 0.3;
pub const DEFAULT_BLINK_MAX_HOLD: f64 = 0.8;

/// Dispatch defaults
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 500;
pub const DEFAULT_SCROLL_STEPS: u32 = 3;
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Polling interval while waiting for a spawned injection command
pub const COMMAND_POLL_INTERVAL_MS: u64 = 5;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
