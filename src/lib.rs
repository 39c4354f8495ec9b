//! Face gesture control library for hands-free pointer input.
//!
//! This library turns per-frame facial measurements into pointer actions:
//! - Eye-openness ratios and head roll/pitch derived from face-mesh landmarks
//! - Weighted moving-average smoothing of every signal
//! - Independent per-gesture classifiers with cooldowns and hold windows
//! - Action dispatch through a fallback chain of input backends (`xdotool`, X11)
//!
//! The processing pipeline consists of:
//! 1. Signal conditioning to smooth raw eye ratios and head angles
//! 2. Gesture classification (winks, both-eye blink, four head tilts)
//! 3. Event aggregation across all classifiers, gated by a kill switch
//! 4. Action dispatch: clicks, drag toggle and scrolling
//!
//! # Examples
//!
//! ## Replaying Samples
//!
//! ```no_run
//! use face_gesture_control::{
//!     backend::LogBackend,
//!     config::Config,
//!     engine::GestureEngine,
//!     landmarks::{HeadPose, RawSample},
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let mut engine = GestureEngine::new(&config, vec![Box::new(LogBackend)])?;
//!
//! // Head tilted 30 degrees down
//! let sample = RawSample {
//!     left_eye_ratio: Some(0.02),
//!     right_eye_ratio: Some(0.02),
//!     pose: Some(HeadPose { roll_deg: 0.0, pitch_deg: 30.0 }),
//!     timestamp: 0.0,
//! };
//!
//! let report = engine.process_sample(&sample);
//! for event in &report.events {
//!     println!("{} (confidence {:.2})", event.gesture, event.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Emergency Stop
//!
//! ```no_run
//! use face_gesture_control::{config::Config, engine::GestureEngine};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = GestureEngine::from_config(&Config::default())?;
//!
//! // The handle can be moved to another thread, e.g. a hotkey listener
//! let stop = engine.emergency_stop();
//! std::thread::spawn(move || {
//!     stop.trigger();
//! });
//! # Ok(())
//! # }
//! ```

/// Fixed-capacity sample history
pub mod ring_buffer;

/// Signal filtering algorithms for smoothing eye ratios and head angles
pub mod filters;

/// Landmark geometry and raw per-frame samples
pub mod landmarks;

/// Signal conditioning stage
pub mod conditioner;

/// Gesture types and events
pub mod gesture;

/// Per-gesture state machines
pub mod classifier;

/// Event aggregation and kill switch
pub mod aggregator;

/// Input-injection backends
pub mod backend;

/// Gesture-to-action mapping and drag state
pub mod dispatcher;

/// Complete per-frame pipeline
pub mod engine;

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
