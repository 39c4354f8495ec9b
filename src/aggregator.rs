//! Runs every classifier on each conditioned frame and collects accepted events.

use crate::{
    classifier::GestureClassifier,
    conditioner::ConditionedFrame,
    config::GestureConfig,
    gesture::{GestureEvent, GestureMap, GestureType},
};
use log::{debug, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag that silences every classifier while engaged
#[derive(Debug, Clone, Default)]
pub struct KillSwitch(Arc<AtomicBool>);

impl KillSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            info!("Gesture kill switch engaged");
        }
    }

    pub fn release(&self) {
        if self.0.swap(false, Ordering::SeqCst) {
            info!("Gesture kill switch released");
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns one classifier per gesture type
pub struct EventAggregator {
    classifiers: GestureMap<GestureClassifier>,
    kill_switch: KillSwitch,
}

impl EventAggregator {
    /// # Panics
    ///
    /// Panics if `config.history_capacity` is zero; `Config::validate` rejects that.
    pub fn new(config: &GestureConfig) -> Self {
        let configs = config.classifier_configs();
        Self {
            classifiers: GestureMap::from_fn(|gesture| {
                GestureClassifier::new(configs[gesture], config.history_capacity)
            }),
            kill_switch: KillSwitch::new(),
        }
    }

    /// Evaluate every classifier, in gesture order, on one frame
    pub fn aggregate(&mut self, frame: &ConditionedFrame, now: f64) -> Vec<GestureEvent> {
        let disabled = self.kill_switch.is_engaged();
        let mut events = Vec::new();

        for gesture in GestureType::ALL {
            let classifier = &mut self.classifiers[gesture];
            let cooldown = if disabled {
                f64::INFINITY
            } else {
                classifier.config().cooldown
            };
            if let Some(event) = classifier.evaluate_with_cooldown(frame, now, cooldown) {
                events.push(event);
            }
        }

        if events.len() > 1 {
            debug!("{} gestures accepted in one frame at {:.3}s", events.len(), now);
        }
        events
    }

    /// Handle for disabling classification from another thread
    pub fn kill_switch(&self) -> KillSwitch {
        self.kill_switch.clone()
    }

    pub fn classifier(&self, gesture: GestureType) -> &GestureClassifier {
        &self.classifiers[gesture]
    }

    /// Forget every cooldown and hold history
    pub fn reset_cooldowns(&mut self) {
        for gesture in GestureType::ALL {
            self.classifiers[gesture].reset();
        }
        debug!("All gesture cooldowns reset");
    }
}
