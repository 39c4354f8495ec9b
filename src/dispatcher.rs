//! Maps gesture events to pointer commands and runs them through the backend chain.
//!
//! The dispatcher owns the drag state machine:
//!
//! ```text
//!   Released --BothBlink, press ok--> Held
//!   Held --BothBlink, release ok--> Released
//!   Held --force_release--> Released   (always)
//! ```
//!
//! A failed press leaves the state `Released`. A failed release leaves it
//! `Held`, since the button may still be down and the next blink retries.

use crate::{
    backend::{Button, InputBackend, ScrollDirection},
    config::DispatchConfig,
    gesture::{GestureEvent, GestureMap, GestureType},
};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// A single request sent to the backend chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    MoveTo(i32, i32),
    Click(Button),
    Press(Button),
    Release(Button),
    Scroll(ScrollDirection, u32),
}

/// Statistics key for dispatched commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    LeftClick,
    RightClick,
    DragPress,
    DragRelease,
    ScrollUp,
    ScrollDown,
    ScrollLeft,
    ScrollRight,
    PointerMove,
}

impl CommandKind {
    pub const COUNT: usize = 9;

    pub const ALL: [Self; Self::COUNT] = [
        Self::LeftClick,
        Self::RightClick,
        Self::DragPress,
        Self::DragRelease,
        Self::ScrollUp,
        Self::ScrollDown,
        Self::ScrollLeft,
        Self::ScrollRight,
        Self::PointerMove,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// Outcome counters for one command kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommandStats {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchStatistics {
    pub commands: BTreeMap<CommandKind, CommandStats>,
    pub drag_active: bool,
}

impl DispatchStatistics {
    pub fn get(&self, kind: CommandKind) -> CommandStats {
        self.commands.get(&kind).copied().unwrap_or_default()
    }

    /// Sum over all command kinds
    pub fn total(&self) -> CommandStats {
        self.commands.values().fold(CommandStats::default(), |acc, s| CommandStats {
            attempts: acc.attempts + s.attempts,
            successes: acc.successes + s.successes,
            failures: acc.failures + s.failures,
        })
    }
}

/// Drag toggle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Released,
    /// Button held; `anchor` is the pointer position at press time when known
    Held { anchor: Option<(i32, i32)> },
}

/// Executes gesture events against an ordered list of input backends
pub struct ActionDispatcher {
    backends: Vec<Box<dyn InputBackend>>,
    timeout: Duration,
    scroll_steps: u32,
    drag: DragState,
    stats: [CommandStats; CommandKind::COUNT],
    last_dispatch: GestureMap<Option<f64>>,
}

impl ActionDispatcher {
    pub fn new(backends: Vec<Box<dyn InputBackend>>, config: &DispatchConfig) -> Self {
        if backends.is_empty() {
            warn!("Action dispatcher created without backends; every command will fail");
        }
        Self {
            backends,
            timeout: config.backend_timeout(),
            scroll_steps: config.scroll_steps,
            drag: DragState::Released,
            stats: [CommandStats::default(); CommandKind::COUNT],
            last_dispatch: GestureMap::filled(None),
        }
    }

    /// Execute the action mapped to `event`; returns false if every backend failed
    pub fn dispatch(&mut self, event: &GestureEvent) -> bool {
        debug!("Dispatching {} (confidence {:.2})", event.gesture, event.confidence);
        self.last_dispatch[event.gesture] = Some(event.timestamp);
        let steps = self.scroll_steps;
        match event.gesture {
            GestureType::WinkLeft => self.execute(CommandKind::LeftClick, Command::Click(Button::Left)),
            GestureType::WinkRight => self.execute(CommandKind::RightClick, Command::Click(Button::Right)),
            GestureType::BothBlink => self.toggle_drag(),
            GestureType::TiltUp => self.execute(CommandKind::ScrollUp, Command::Scroll(ScrollDirection::Up, steps)),
            GestureType::TiltDown => {
                self.execute(CommandKind::ScrollDown, Command::Scroll(ScrollDirection::Down, steps))
            }
            GestureType::TiltLeft => {
                self.execute(CommandKind::ScrollLeft, Command::Scroll(ScrollDirection::Left, steps))
            }
            GestureType::TiltRight => {
                self.execute(CommandKind::ScrollRight, Command::Scroll(ScrollDirection::Right, steps))
            }
        }
    }

    /// Move the pointer to absolute screen coordinates through the backend chain
    pub fn move_pointer(&mut self, x: i32, y: i32) -> bool {
        self.execute(CommandKind::PointerMove, Command::MoveTo(x, y))
    }

    /// Release a held drag button; always leaves the dispatcher `Released`
    ///
    /// Returns false if the release could not be delivered.
    pub fn force_release(&mut self) -> bool {
        match self.drag {
            DragState::Released => true,
            DragState::Held { .. } => {
                let delivered = self.execute(CommandKind::DragRelease, Command::Release(Button::Left));
                self.drag = DragState::Released;
                if delivered {
                    info!("Drag force-released");
                } else {
                    warn!("Drag force-release could not be delivered; button may still be down");
                }
                delivered
            }
        }
    }

    pub const fn drag_state(&self) -> DragState {
        self.drag
    }

    pub const fn is_drag_active(&self) -> bool {
        matches!(self.drag, DragState::Held { .. })
    }

    pub const fn drag_anchor(&self) -> Option<(i32, i32)> {
        match self.drag {
            DragState::Held { anchor } => anchor,
            DragState::Released => None,
        }
    }

    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn statistics(&self) -> DispatchStatistics {
        DispatchStatistics {
            commands: CommandKind::ALL
                .iter()
                .map(|&kind| (kind, self.stats[kind.index()]))
                .collect(),
            drag_active: self.is_drag_active(),
        }
    }

    /// Timestamp of the last event of `gesture` handed to the dispatcher
    pub fn last_dispatch_time(&self, gesture: GestureType) -> Option<f64> {
        self.last_dispatch[gesture]
    }

    pub fn reset_statistics(&mut self) {
        self.stats = [CommandStats::default(); CommandKind::COUNT];
        self.last_dispatch = GestureMap::filled(None);
    }

    fn toggle_drag(&mut self) -> bool {
        match self.drag {
            DragState::Released => {
                let anchor = self.pointer_position();
                if !self.execute(CommandKind::DragPress, Command::Press(Button::Left)) {
                    return false;
                }
                self.drag = DragState::Held { anchor };
                info!("Drag started at {anchor:?}");
                true
            }
            DragState::Held { .. } => {
                if !self.execute(CommandKind::DragRelease, Command::Release(Button::Left)) {
                    return false;
                }
                self.drag = DragState::Released;
                info!("Drag ended");
                true
            }
        }
    }

    /// Best-effort pointer query; never counted as a command
    fn pointer_position(&mut self) -> Option<(i32, i32)> {
        let timeout = self.timeout;
        self.backends
            .iter_mut()
            .find_map(|backend| backend.pointer_position(timeout).ok())
    }

    fn execute(&mut self, kind: CommandKind, command: Command) -> bool {
        let delivered = self.run_chain(command);
        let stats = &mut self.stats[kind.index()];
        stats.attempts += 1;
        if delivered {
            stats.successes += 1;
        } else {
            stats.failures += 1;
            warn!("All input backends failed for {command:?}");
        }
        delivered
    }

    fn run_chain(&mut self, command: Command) -> bool {
        let timeout = self.timeout;
        for backend in &mut self.backends {
            let result = match command {
                Command::MoveTo(x, y) => backend.move_to(x, y, timeout),
                Command::Click(button) => backend.click(button, timeout),
                Command::Press(button) => backend.press(button, timeout),
                Command::Release(button) => backend.release(button, timeout),
                Command::Scroll(direction, steps) => backend.scroll(direction, steps, timeout),
            };
            match result {
                Ok(()) => {
                    debug!("{command:?} delivered by {}", backend.name());
                    return true;
                }
                Err(e) => warn!("Backend {} failed for {command:?}: {e}", backend.name()),
            }
        }
        false
    }
}

impl Drop for ActionDispatcher {
    fn drop(&mut self) {
        self.force_release();
    }
}
