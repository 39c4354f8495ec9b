//! Per-frame pipeline: condition, classify, aggregate, dispatch.
//!
//! The frame pass is single-threaded. Dispatch either runs inline, or on a
//! worker thread fed by a bounded queue so slow backends never stall frame
//! processing. A full queue drops the event.

use crate::{
    aggregator::{EventAggregator, KillSwitch},
    backend::{create_backends, InputBackend},
    conditioner::{ConditionedFrame, SignalConditioner},
    config::{Config, DispatchMode},
    dispatcher::{ActionDispatcher, DispatchStatistics},
    gesture::GestureEvent,
    landmarks::{LandmarkSet, LandmarkSource, RawSample},
    Result,
};
use crossbeam_channel::{bounded, Sender, TrySendError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

pub type SharedDispatcher = Arc<Mutex<ActionDispatcher>>;

/// What happened to one accepted event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Executed inline; false if every backend failed
    Dispatched(bool),
    /// Handed to the dispatch worker
    Queued,
    /// Worker queue full or closed, or gestures disabled before dispatch
    Dropped,
}

/// Result of processing one frame
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub frame: ConditionedFrame,
    pub events: Vec<GestureEvent>,
    /// One entry per event, same order
    pub outcomes: Vec<DispatchOutcome>,
}

/// Cloneable handle that disables gestures and releases any held drag
#[derive(Clone)]
pub struct EmergencyStop {
    kill_switch: KillSwitch,
    dispatcher: SharedDispatcher,
}

impl EmergencyStop {
    /// Engage the kill switch and force-release the drag button
    ///
    /// Safe to call repeatedly; returns false if a held button could not be released.
    pub fn trigger(&self) -> bool {
        self.kill_switch.engage();
        self.dispatcher.lock().force_release()
    }

    /// Re-enable gesture classification
    pub fn resume(&self) {
        self.kill_switch.release();
    }

    pub fn is_engaged(&self) -> bool {
        self.kill_switch.is_engaged()
    }
}

struct DispatchWorker {
    sender: Option<Sender<GestureEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl DispatchWorker {
    fn spawn(dispatcher: SharedDispatcher, kill_switch: KillSwitch, capacity: usize) -> Result<Self> {
        let (sender, receiver) = bounded::<GestureEvent>(capacity);
        let handle = thread::Builder::new()
            .name("gesture-dispatch".to_string())
            .spawn(move || {
                for event in receiver {
                    let mut dispatcher = dispatcher.lock();
                    // Checked under the lock so nothing slips in after an emergency stop
                    if kill_switch.is_engaged() {
                        debug!("Skipping queued {} while disabled", event.gesture);
                        continue;
                    }
                    dispatcher.dispatch(&event);
                }
                debug!("Dispatch worker exiting");
            })?;

        info!("Dispatch worker started (queue capacity {capacity})");
        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
        })
    }

    fn submit(&self, event: GestureEvent) -> DispatchOutcome {
        let Some(sender) = &self.sender else {
            return DispatchOutcome::Dropped;
        };
        match sender.try_send(event) {
            Ok(()) => DispatchOutcome::Queued,
            Err(TrySendError::Full(event)) => {
                warn!("Dispatch queue full, dropping {}", event.gesture);
                DispatchOutcome::Dropped
            }
            Err(TrySendError::Disconnected(event)) => {
                warn!("Dispatch worker gone, dropping {}", event.gesture);
                DispatchOutcome::Dropped
            }
        }
    }
}

impl Drop for DispatchWorker {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain and exit
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Dispatch worker panicked");
            }
        }
    }
}

/// The complete gesture pipeline
pub struct GestureEngine {
    conditioner: SignalConditioner,
    aggregator: EventAggregator,
    worker: Option<DispatchWorker>,
    dispatcher: SharedDispatcher,
    queue_capacity: usize,
    neutral_pitch_deg: f64,
    clock: Instant,
}

impl GestureEngine {
    /// Build an engine over explicit backends
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker thread
    /// cannot be started
    pub fn new(config: &Config, backends: Vec<Box<dyn InputBackend>>) -> Result<Self> {
        config.validate()?;

        let aggregator = EventAggregator::new(&config.gestures);
        let dispatcher = Arc::new(Mutex::new(ActionDispatcher::new(backends, &config.dispatch)));
        let worker = match config.dispatch.mode {
            DispatchMode::Inline => None,
            DispatchMode::Worker => Some(DispatchWorker::spawn(
                Arc::clone(&dispatcher),
                aggregator.kill_switch(),
                config.dispatch.queue_capacity,
            )?),
        };

        Ok(Self {
            conditioner: SignalConditioner::new(&config.conditioner)?,
            aggregator,
            worker,
            dispatcher,
            queue_capacity: config.dispatch.queue_capacity,
            neutral_pitch_deg: config.geometry.neutral_pitch_deg,
            clock: Instant::now(),
        })
    }

    /// Build an engine with the backends named in the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let backends = create_backends(&config.dispatch)?;
        Self::new(config, backends)
    }

    /// Run one raw sample through the pipeline
    pub fn process_sample(&mut self, raw: &RawSample) -> FrameReport {
        let frame = self.conditioner.condition(raw);
        let events = self.aggregator.aggregate(&frame, raw.timestamp);

        let outcomes = events
            .iter()
            .map(|event| {
                info!("Gesture {} (confidence {:.2})", event.gesture, event.confidence);
                match &self.worker {
                    Some(worker) => worker.submit(*event),
                    None => self.dispatch_inline(event),
                }
            })
            .collect();

        FrameReport {
            frame,
            events,
            outcomes,
        }
    }

    fn dispatch_inline(&self, event: &GestureEvent) -> DispatchOutcome {
        let mut dispatcher = self.dispatcher.lock();
        // An emergency stop may land between aggregation and this lock
        if self.aggregator.kill_switch().is_engaged() {
            debug!("Skipping {} while disabled", event.gesture);
            return DispatchOutcome::Dropped;
        }
        DispatchOutcome::Dispatched(dispatcher.dispatch(event))
    }

    /// Derive signals from landmarks (or their absence) and process them at `now`
    pub fn process_frame(&mut self, landmarks: Option<&LandmarkSet>, now: f64) -> FrameReport {
        let raw = RawSample::from_landmarks(landmarks, now, self.neutral_pitch_deg);
        self.process_sample(&raw)
    }

    /// Pull the next frame from `source`, stamped with the engine clock
    pub fn step(&mut self, source: &mut dyn LandmarkSource) -> FrameReport {
        let landmarks = source.next_landmarks();
        let now = self.clock.elapsed().as_secs_f64();
        self.process_frame(landmarks.as_ref(), now)
    }

    pub fn emergency_stop(&self) -> EmergencyStop {
        EmergencyStop {
            kill_switch: self.aggregator.kill_switch(),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }

    pub fn kill_switch(&self) -> KillSwitch {
        self.aggregator.kill_switch()
    }

    pub fn dispatcher(&self) -> SharedDispatcher {
        Arc::clone(&self.dispatcher)
    }

    pub fn statistics(&self) -> DispatchStatistics {
        self.dispatcher.lock().statistics()
    }

    pub fn reset_cooldowns(&mut self) {
        self.aggregator.reset_cooldowns();
    }

    /// Clear smoothing history and cooldowns
    pub fn reset(&mut self) {
        self.conditioner.reset();
        self.aggregator.reset_cooldowns();
    }

    /// Wait until every queued event has been dispatched
    pub fn flush(&mut self) {
        if let Some(worker) = self.worker.take() {
            drop(worker);
            self.worker = match DispatchWorker::spawn(
                Arc::clone(&self.dispatcher),
                self.aggregator.kill_switch(),
                self.queue_capacity,
            ) {
                Ok(worker) => Some(worker),
                Err(e) => {
                    warn!("Failed to restart dispatch worker, dispatching inline: {e}");
                    None
                }
            };
        }
    }
}

impl Drop for GestureEngine {
    fn drop(&mut self) {
        self.worker.take();
        self.dispatcher.lock().force_release();
    }
}
