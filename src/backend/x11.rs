use super::{BackendError, BackendResult, Button, InputBackend, ScrollDirection};
use log::{debug, info};
use std::time::{Duration, Instant};
use x11rb::{
    connection::{Connection, RequestConnection},
    protocol::{
        xproto::{ConnectionExt, Window, BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT},
        xtest::{self, ConnectionExt as _},
    },
    rust_connection::RustConnection,
    CURRENT_TIME,
};

/// Injects pointer input through the `XTEST` extension
pub struct X11Backend {
    connection: RustConnection,
    root: Window,
}

impl X11Backend {
    /// Connect to the display named by `$DISPLAY`
    pub fn connect() -> crate::Result<Self> {
        info!("Initializing X11 input backend");

        let (connection, screen_num) = RustConnection::connect(None)
            .map_err(|e| crate::Error::X11(format!("Failed to connect to X11: {e}")))?;

        let root = connection
            .setup()
            .roots
            .get(screen_num)
            .ok_or_else(|| crate::Error::X11("Failed to get screen".to_string()))?
            .root;

        let xtest_present = connection
            .extension_information(xtest::X11_EXTENSION_NAME)
            .map_err(|e| crate::Error::X11(format!("Failed to query XTEST: {e}")))?
            .is_some();
        if !xtest_present {
            return Err(crate::Error::X11("XTEST extension not available".to_string()));
        }

        info!("Connected to X11 display, screen {screen_num}");
        Ok(Self { connection, root })
    }

    /// Send one fake event and wait for the server to acknowledge it
    fn fake_button(&self, event_type: u8, button: u8, timeout: Duration) -> BackendResult<()> {
        let start = Instant::now();
        self.connection
            .xtest_fake_input(event_type, button, CURRENT_TIME, self.root, 0, 0, 0)
            .map_err(|e| BackendError::Connection(format!("Failed to send fake input: {e}")))?
            .check()
            .map_err(|e| BackendError::Connection(format!("Fake input rejected: {e}")))?;
        within(start, timeout)
    }
}

/// Requests cannot be cancelled once sent, so a slow round trip is reported after the fact
fn within(start: Instant, timeout: Duration) -> BackendResult<()> {
    if start.elapsed() > timeout {
        return Err(BackendError::Timeout(timeout));
    }
    Ok(())
}

/// Fold per-event acknowledgements into one result; every event is checked
fn all_acknowledged<E: std::fmt::Display>(acks: impl IntoIterator<Item = Result<(), E>>) -> BackendResult<()> {
    let mut rejected = 0;
    let mut first = None;
    for (index, ack) in acks.into_iter().enumerate() {
        if let Err(e) = ack {
            rejected += 1;
            first.get_or_insert_with(|| format!("event {}: {e}", index + 1));
        }
    }
    match first {
        Some(first) => Err(BackendError::Connection(format!(
            "{rejected} wheel events rejected, first at {first}"
        ))),
        None => Ok(()),
    }
}

fn saturate(value: i32) -> i16 {
    i16::try_from(value).unwrap_or(if value < 0 { i16::MIN } else { i16::MAX })
}

impl InputBackend for X11Backend {
    fn name(&self) -> &str {
        "x11"
    }

    fn move_to(&mut self, x: i32, y: i32, timeout: Duration) -> BackendResult<()> {
        let start = Instant::now();
        debug!("Warping pointer to ({x}, {y})");
        self.connection
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, saturate(x), saturate(y))
            .map_err(|e| BackendError::Connection(format!("Failed to warp pointer: {e}")))?
            .check()
            .map_err(|e| BackendError::Connection(format!("Warp rejected: {e}")))?;
        within(start, timeout)
    }

    fn click(&mut self, button: Button, timeout: Duration) -> BackendResult<()> {
        let start = Instant::now();
        self.fake_button(BUTTON_PRESS_EVENT, button.x11_button(), timeout)?;
        self.fake_button(BUTTON_RELEASE_EVENT, button.x11_button(), timeout)?;
        within(start, timeout)
    }

    fn press(&mut self, button: Button, timeout: Duration) -> BackendResult<()> {
        self.fake_button(BUTTON_PRESS_EVENT, button.x11_button(), timeout)
    }

    fn release(&mut self, button: Button, timeout: Duration) -> BackendResult<()> {
        self.fake_button(BUTTON_RELEASE_EVENT, button.x11_button(), timeout)
    }

    fn scroll(&mut self, direction: ScrollDirection, steps: u32, timeout: Duration) -> BackendResult<()> {
        let start = Instant::now();
        let wheel = direction.x11_button();
        let mut cookies = Vec::new();
        for _ in 0..steps {
            for event_type in [BUTTON_PRESS_EVENT, BUTTON_RELEASE_EVENT] {
                let cookie = self
                    .connection
                    .xtest_fake_input(event_type, wheel, CURRENT_TIME, self.root, 0, 0, 0)
                    .map_err(|e| BackendError::Connection(format!("Failed to send wheel step: {e}")))?;
                cookies.push(cookie);
            }
        }
        all_acknowledged(cookies.into_iter().map(|cookie| cookie.check()))?;
        within(start, timeout)
    }

    fn pointer_position(&mut self, timeout: Duration) -> BackendResult<(i32, i32)> {
        let start = Instant::now();
        let reply = self
            .connection
            .query_pointer(self.root)
            .map_err(|e| BackendError::Connection(format!("Failed to send query pointer: {e}")))?
            .reply()
            .map_err(|e| BackendError::Connection(format!("Failed to query pointer: {e}")))?;
        within(start, timeout)?;
        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }
}
