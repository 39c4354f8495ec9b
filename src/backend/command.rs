use super::{BackendError, BackendResult, Button, InputBackend, ScrollDirection};
use crate::constants::COMMAND_POLL_INTERVAL_MS;
use log::debug;
use std::io::{self, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Drives an `xdotool`-compatible program, one child process per command
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
}

impl CommandBackend {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the program with `args` and return its stdout
    ///
    /// Stdout is drained on a reader thread while the child is polled until it
    /// exits or `timeout` passes, in which case it is killed.
    fn run(&self, args: &[&str], timeout: Duration) -> BackendResult<String> {
        debug!("Running {} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| BackendError::Spawn(format!("{}: {e}", self.program)))?;

        let stdout = child.stdout.take();
        let reader = thread::spawn(move || -> io::Result<String> {
            let mut output = String::new();
            if let Some(mut stdout) = stdout {
                stdout.read_to_string(&mut output)?;
            }
            Ok(output)
        });

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => {
                    return reader
                        .join()
                        .map_err(|_| BackendError::Status("output reader panicked".to_string()))?
                        .map_err(|e| BackendError::Status(format!("unreadable output: {e}")));
                }
                Ok(Some(status)) => {
                    return Err(BackendError::Status(format!(
                        "{} {} exited with {status}",
                        self.program,
                        args.join(" ")
                    )));
                }
                Ok(None) if Instant::now() >= deadline => {
                    // Already-exited children make kill fail; the wait reaps either way
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(BackendError::Timeout(timeout));
                }
                Ok(None) => thread::sleep(Duration::from_millis(COMMAND_POLL_INTERVAL_MS)),
                Err(e) => return Err(BackendError::Status(format!("wait failed: {e}"))),
            }
        }
    }
}

/// Parse `x:123 y:456 screen:0 window:789`
pub fn parse_mouse_location(output: &str) -> Option<(i32, i32)> {
    let mut x = None;
    let mut y = None;
    for field in output.split_whitespace() {
        if let Some(value) = field.strip_prefix("x:") {
            x = value.parse().ok();
        } else if let Some(value) = field.strip_prefix("y:") {
            y = value.parse().ok();
        }
    }
    Some((x?, y?))
}

impl InputBackend for CommandBackend {
    fn name(&self) -> &str {
        &self.program
    }

    fn move_to(&mut self, x: i32, y: i32, timeout: Duration) -> BackendResult<()> {
        self.run(&["mousemove", x.to_string().as_str(), y.to_string().as_str()], timeout)
            .map(drop)
    }

    fn click(&mut self, button: Button, timeout: Duration) -> BackendResult<()> {
        self.run(&["click", button.x11_button().to_string().as_str()], timeout)
            .map(drop)
    }

    fn press(&mut self, button: Button, timeout: Duration) -> BackendResult<()> {
        self.run(&["mousedown", button.x11_button().to_string().as_str()], timeout)
            .map(drop)
    }

    fn release(&mut self, button: Button, timeout: Duration) -> BackendResult<()> {
        self.run(&["mouseup", button.x11_button().to_string().as_str()], timeout)
            .map(drop)
    }

    fn scroll(&mut self, direction: ScrollDirection, steps: u32, timeout: Duration) -> BackendResult<()> {
        self.run(
            &[
                "click",
                "--repeat",
                steps.to_string().as_str(),
                direction.x11_button().to_string().as_str(),
            ],
            timeout,
        )
        .map(drop)
    }

    fn pointer_position(&mut self, timeout: Duration) -> BackendResult<(i32, i32)> {
        let output = self.run(&["getmouselocation"], timeout)?;
        parse_mouse_location(&output)
            .ok_or_else(|| BackendError::Status(format!("unexpected location output: {}", output.trim())))
    }
}
