use super::{BackendResult, Button, InputBackend, ScrollDirection};
use log::info;
use std::time::Duration;

/// Logs every command instead of injecting it
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBackend;

impl InputBackend for LogBackend {
    fn name(&self) -> &str {
        "log"
    }

    fn move_to(&mut self, x: i32, y: i32, _timeout: Duration) -> BackendResult<()> {
        info!("[dry run] move pointer to ({x}, {y})");
        Ok(())
    }

    fn click(&mut self, button: Button, _timeout: Duration) -> BackendResult<()> {
        info!("[dry run] click {button:?}");
        Ok(())
    }

    fn press(&mut self, button: Button, _timeout: Duration) -> BackendResult<()> {
        info!("[dry run] press {button:?}");
        Ok(())
    }

    fn release(&mut self, button: Button, _timeout: Duration) -> BackendResult<()> {
        info!("[dry run] release {button:?}");
        Ok(())
    }

    fn scroll(&mut self, direction: ScrollDirection, steps: u32, _timeout: Duration) -> BackendResult<()> {
        info!("[dry run] scroll {direction:?} x{steps}");
        Ok(())
    }
}
