//! End-to-end tests of the gesture engine: landmarks in, backend calls out


use face_gesture_control::{
    config::DispatchMode,
    constants::{
        CHIN, LEFT_EYE_BOTTOM, LEFT_EYE_OUTER_CORNER, LEFT_EYE_TOP, NOSE_TIP, RIGHT_EYE_BOTTOM,
        RIGHT_EYE_INNER_CORNER, RIGHT_EYE_TOP,
    },
    dispatcher::CommandKind,
    engine::{DispatchOutcome, GestureEngine},
    gesture::GestureType,
    landmarks::{LandmarkSet, LandmarkSource, Point},
};
use std::collections::VecDeque;
use std::thread;
use std::time::Duration;
use test_helpers::{closure, sample, unsmoothed_config, CallLog, ScriptedBackend, CLOSED, OPEN};

/// Face with the given eyelid gaps and nose height
fn face(left_gap: f64, right_gap: f64, nose_y: f64) -> LandmarkSet {
    let mut set = LandmarkSet::default();
    set.set(LEFT_EYE_TOP, Point::new(0.40, 0.40 - left_gap / 2.0));
    set.set(LEFT_EYE_BOTTOM, Point::new(0.40, 0.40 + left_gap / 2.0));
    set.set(RIGHT_EYE_TOP, Point::new(0.60, 0.40 - right_gap / 2.0));
    set.set(RIGHT_EYE_BOTTOM, Point::new(0.60, 0.40 + right_gap / 2.0));
    set.set(LEFT_EYE_OUTER_CORNER, Point::new(0.35, 0.40));
    set.set(RIGHT_EYE_INNER_CORNER, Point::new(0.55, 0.40));
    set.set(NOSE_TIP, Point::new(0.50, nose_y));
    set.set(CHIN, Point::new(0.50, 0.81));
    set
}

struct ScriptedSource(VecDeque<Option<LandmarkSet>>);

impl LandmarkSource for ScriptedSource {
    fn next_landmarks(&mut self) -> Option<LandmarkSet> {
        self.0.pop_front().flatten()
    }
}

#[test]
fn test_wink_from_landmarks_clicks() {
    let log = CallLog::default();
    let mut engine = GestureEngine::new(&unsmoothed_config(), vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();

    let mut events = Vec::new();
    for i in 0..8 {
        let t = f64::from(i) * 0.05;
        events.extend(engine.process_frame(Some(&face(CLOSED, OPEN, 0.55)), t).events);
    }
    events.extend(engine.process_frame(Some(&face(OPEN, OPEN, 0.55)), 0.4).events);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].gesture, GestureType::WinkLeft);
    assert_eq!(log.calls(), vec!["a:click Left"]);
}

#[test]
fn test_head_down_scrolls() {
    let log = CallLog::default();
    let mut engine = GestureEngine::new(&unsmoothed_config(), vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();

    let report = engine.process_frame(Some(&face(OPEN, OPEN, 0.70)), 0.0);
    assert_eq!(report.events.len(), 1);
    assert_eq!(report.events[0].gesture, GestureType::TiltDown);
    assert_eq!(report.outcomes, vec![DispatchOutcome::Dispatched(true)]);
    assert_eq!(log.calls(), vec!["a:scroll Down 3"]);
}

#[test]
fn test_source_without_face() {
    let log = CallLog::default();
    let mut engine = GestureEngine::new(&unsmoothed_config(), vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();
    let mut source = ScriptedSource(VecDeque::from(vec![None, None, Some(face(OPEN, OPEN, 0.55))]));

    for _ in 0..2 {
        let report = engine.step(&mut source);
        assert!(!report.frame.landmarks_valid);
        assert!(report.events.is_empty());
    }
    assert!(engine.step(&mut source).frame.landmarks_valid);
    assert!(log.calls().is_empty());
}

#[test]
fn test_face_loss_interrupts_hold() {
    let log = CallLog::default();
    let mut engine = GestureEngine::new(&unsmoothed_config(), vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();

    for i in 0..4 {
        engine.process_frame(Some(&face(CLOSED, OPEN, 0.55)), f64::from(i) * 0.05);
    }
    assert!(engine.process_frame(None, 0.2).events.is_empty());
    engine.process_frame(Some(&face(CLOSED, OPEN, 0.55)), 0.25);
    assert!(engine.process_frame(Some(&face(OPEN, OPEN, 0.55)), 0.3).events.is_empty());
}

#[test]
fn test_dispatch_failure_is_not_fatal() {
    let log = CallLog::default();
    let mut engine = GestureEngine::new(
        &unsmoothed_config(),
        vec![ScriptedBackend::failing("a", &log).boxed()],
    )
    .unwrap();

    let report = engine.process_sample(&sample(OPEN, OPEN, 30.0, 0.0, 0.0));
    assert_eq!(report.outcomes, vec![DispatchOutcome::Dispatched(false)]);
    let report = engine.process_sample(&sample(OPEN, OPEN, -30.0, 0.0, 0.1));
    assert_eq!(report.outcomes, vec![DispatchOutcome::Dispatched(false)]);

    let stats = engine.statistics();
    assert_eq!(stats.get(CommandKind::ScrollRight).failures, 1);
    assert_eq!(stats.get(CommandKind::ScrollLeft).failures, 1);
    assert_eq!(stats.total().successes, 0);
}

#[test]
fn test_emergency_stop_releases_drag() {
    let log = CallLog::default();
    let mut engine = GestureEngine::new(&unsmoothed_config(), vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();

    let events: usize = closure(CLOSED, CLOSED, 0.0, 8)
        .iter()
        .map(|s| engine.process_sample(s).events.len())
        .sum();
    assert_eq!(events, 1);
    assert!(engine.dispatcher().lock().is_drag_active());

    let stop = engine.emergency_stop();
    let remote = stop.clone();
    thread::spawn(move || remote.trigger()).join().unwrap();
    assert!(!engine.dispatcher().lock().is_drag_active());

    // Nothing fires while disabled, and a second stop does not release again
    for s in closure(CLOSED, CLOSED, 5.0, 8) {
        assert!(engine.process_sample(&s).events.is_empty());
    }
    assert!(stop.trigger());
    assert_eq!(log.calls(), vec!["a:press Left", "a:release Left"]);

    stop.resume();
    let events: usize = closure(CLOSED, CLOSED, 10.0, 8)
        .iter()
        .map(|s| engine.process_sample(s).events.len())
        .sum();
    assert_eq!(events, 1);
}

#[test]
fn test_dropping_engine_releases_drag() {
    let log = CallLog::default();
    {
        let mut engine =
            GestureEngine::new(&unsmoothed_config(), vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();
        for s in closure(CLOSED, CLOSED, 0.0, 8) {
            engine.process_sample(&s);
        }
    }
    assert_eq!(log.calls(), vec!["a:press Left", "a:release Left"]);
}

#[test]
fn test_worker_mode_dispatches_in_background() {
    let log = CallLog::default();
    let mut config = unsmoothed_config();
    config.dispatch.mode = DispatchMode::Worker;
    let mut engine = GestureEngine::new(&config, vec![ScriptedBackend::new("a", &log).boxed()]).unwrap();

    let report = engine.process_sample(&sample(OPEN, OPEN, 0.0, -30.0, 0.0));
    assert_eq!(report.outcomes, vec![DispatchOutcome::Queued]);
    engine.flush();
    assert_eq!(log.calls(), vec!["a:scroll Up 3"]);
}

#[test]
fn test_full_queue_drops_events() {
    let log = CallLog::default();
    let mut config = unsmoothed_config();
    config.dispatch.mode = DispatchMode::Worker;
    config.dispatch.queue_capacity = 1;
    let slow = ScriptedBackend::new("slow", &log).with_delay(Duration::from_millis(200));
    let mut engine = GestureEngine::new(&config, vec![slow.boxed()]).unwrap();

    let mut outcomes = engine.process_sample(&sample(OPEN, OPEN, 30.0, 30.0, 0.0)).outcomes;
    outcomes.extend(engine.process_sample(&sample(OPEN, OPEN, -30.0, -30.0, 0.05)).outcomes);
    assert_eq!(outcomes.len(), 4);

    let queued = outcomes.iter().filter(|o| **o == DispatchOutcome::Queued).count();
    let dropped = outcomes.iter().filter(|o| **o == DispatchOutcome::Dropped).count();
    assert!(queued >= 1);
    assert!(dropped >= 2, "outcomes: {outcomes:?}");

    engine.flush();
    assert_eq!(engine.statistics().total().attempts, queued as u64);
}

#[test]
fn test_worker_skips_queue_after_emergency_stop() {
    let log = CallLog::default();
    let mut config = unsmoothed_config();
    config.dispatch.mode = DispatchMode::Worker;
    let slow = ScriptedBackend::new("slow", &log).with_delay(Duration::from_millis(100));
    let mut engine = GestureEngine::new(&config, vec![slow.boxed()]).unwrap();

    engine.process_sample(&sample(OPEN, OPEN, 30.0, 30.0, 0.0));
    engine.process_sample(&sample(OPEN, OPEN, -30.0, -30.0, 0.05));
    engine.emergency_stop().trigger();
    engine.flush();

    // At most the command already in flight when the stop arrived
    assert!(engine.statistics().total().attempts <= 1);
}
