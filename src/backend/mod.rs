//! Input-injection backends used by the action dispatcher.
//!
//! Every call carries a timeout and reports failure through [`BackendError`];
//! backends never panic. The dispatcher walks an ordered list of backends and
//! stops at the first one that succeeds.

/// External automation tool spawned per command
pub mod command;
/// Dry-run backend that only logs
pub mod log_only;
/// `XTest` fake input over an X11 connection
pub mod x11;

use crate::{config::DispatchConfig, Error, Result};
use log::{info, warn};
use std::time::Duration;

pub use command::CommandBackend;
pub use log_only::LogBackend;
pub use x11::X11Backend;

/// Names accepted by [`create_backend`]
pub const BACKEND_NAMES: [&str; 3] = ["xdotool", "x11", "log"];

/// Failure of a single backend call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("command failed: {0}")]
    Status(String),

    #[error("failed to spawn: {0}")]
    Spawn(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("operation not supported")]
    Unsupported,
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Mouse button driven by click and drag commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Left,
    Right,
}

impl Button {
    /// X11 core button number
    pub const fn x11_button(self) -> u8 {
        match self {
            Self::Left => 1,
            Self::Right => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
    Left,
    Right,
}

impl ScrollDirection {
    /// X11 wheel button number
    pub const fn x11_button(self) -> u8 {
        match self {
            Self::Up => 4,
            Self::Down => 5,
            Self::Left => 6,
            Self::Right => 7,
        }
    }
}

/// A way of injecting pointer input into the desktop
pub trait InputBackend: Send {
    /// Backend name used in logs
    fn name(&self) -> &str;

    /// Move the pointer to absolute screen coordinates
    fn move_to(&mut self, x: i32, y: i32, timeout: Duration) -> BackendResult<()>;

    /// Press and release `button`
    fn click(&mut self, button: Button, timeout: Duration) -> BackendResult<()>;

    /// Press `button` without releasing it
    fn press(&mut self, button: Button, timeout: Duration) -> BackendResult<()>;

    /// Release a previously pressed `button`
    fn release(&mut self, button: Button, timeout: Duration) -> BackendResult<()>;

    /// Emit `steps` wheel steps as a single call
    fn scroll(&mut self, direction: ScrollDirection, steps: u32, timeout: Duration) -> BackendResult<()>;

    /// Current pointer position, if the backend can read it
    fn pointer_position(&mut self, _timeout: Duration) -> BackendResult<(i32, i32)> {
        Err(BackendError::Unsupported)
    }
}

/// Create a backend by name
///
/// # Errors
///
/// Returns an error for unknown names or when the backend cannot be opened
pub fn create_backend(name: &str, config: &DispatchConfig) -> Result<Box<dyn InputBackend>> {
    match name.to_lowercase().as_str() {
        "xdotool" => Ok(Box::new(CommandBackend::new(&config.command))),
        "x11" => Ok(Box::new(X11Backend::connect()?)),
        "log" => Ok(Box::new(LogBackend)),
        other => Err(Error::InvalidInput(format!("Unknown input backend: {other}"))),
    }
}

/// Create the configured fallback chain, skipping backends that fail to open
///
/// # Errors
///
/// Returns an error if no configured backend could be created
pub fn create_backends(config: &DispatchConfig) -> Result<Vec<Box<dyn InputBackend>>> {
    let mut backends = Vec::with_capacity(config.backends.len());
    for name in &config.backends {
        match create_backend(name, config) {
            Ok(backend) => {
                info!("Input backend '{}' ready", backend.name());
                backends.push(backend);
            }
            Err(e) => warn!("Skipping input backend '{name}': {e}"),
        }
    }

    if backends.is_empty() {
        return Err(Error::Backend("No input backend available".to_string()));
    }
    Ok(backends)
}
