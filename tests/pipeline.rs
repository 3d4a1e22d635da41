//! Integration tests for the capture-to-display pipeline: a worker driving a
//! scripted camera, with the relay and gain channel wired exactly as in
//! `main`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use lumen::capture::frame::Frame;
use lumen::capture::testing::{Call, ScriptedCamera, Step};
use lumen::capture::{CaptureWorker, WorkerEvent};
use lumen::pipeline::{FrameRelay, GainControl};

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .with_test_writer()
        .try_init();
}

#[test]
fn worker_publishes_the_newest_frame_into_the_relay() {
    init_test_tracing();

    let relay = Arc::new(FrameRelay::new());
    let gain = Arc::new(GainControl::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let (tx, rx) = flume::unbounded();

    let camera = ScriptedCamera::new(vec![Step::Frame(50), Step::Skip, Step::Frame(200)]);
    let calls = camera.calls();
    let worker = CaptureWorker::new(camera, Arc::clone(&relay), gain, tx, shutdown);
    std::thread::spawn(move || worker.run())
        .join()
        .expect("worker thread panicked");

    // Two real frames, one skipped cycle.
    let mut out = Frame::black();
    assert_eq!(relay.snapshot(&mut out), 2);
    assert!(out.as_bytes().iter().all(|&b| b == 200));

    // Script exhaustion reads as a dying device: terminal stop, session
    // closed exactly once.
    assert!(matches!(
        rx.recv().unwrap(),
        WorkerEvent::Stopped { reason: Some(_) }
    ));
    let calls = calls.lock().unwrap();
    assert_eq!(calls.iter().filter(|c| matches!(c, Call::Stop)).count(), 1);
}

#[test]
fn device_failure_leaves_the_reader_side_fully_usable() {
    init_test_tracing();

    let relay = Arc::new(FrameRelay::new());
    let gain = Arc::new(GainControl::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let (tx, rx) = flume::unbounded();

    let camera = ScriptedCamera::new(vec![Step::Fail("usb yanked")]);
    let worker = CaptureWorker::new(camera, Arc::clone(&relay), Arc::clone(&gain), tx, shutdown);
    std::thread::spawn(move || worker.run())
        .join()
        .expect("worker thread panicked");

    // The failure arrived as an event, not a panic on this side.
    assert!(matches!(
        rx.recv().unwrap(),
        WorkerEvent::Stopped { reason: Some(reason) } if reason.contains("usb yanked")
    ));

    // Reader keeps getting the initial zero frame; the control channel still
    // validates as usual.
    let mut out = Frame::black();
    assert_eq!(relay.snapshot(&mut out), 0);
    assert!(out.as_bytes().iter().all(|&b| b == 0));
    assert!(gain.request(16.0).is_ok());
    assert!(gain.request(300.0).is_err());
}

#[test]
fn request_made_before_startup_is_applied_on_the_first_cycle() {
    init_test_tracing();

    let relay = Arc::new(FrameRelay::new());
    let gain = Arc::new(GainControl::new());
    let shutdown = Arc::new(AtomicBool::new(false));
    let (tx, _rx) = flume::unbounded();

    // Two submissions before the worker ever runs: last write wins, applied
    // exactly once, before the first frame wait.
    gain.request(50.0).unwrap();
    gain.request(75.0).unwrap();

    let camera = ScriptedCamera::new(vec![Step::Frame(1), Step::Frame(2)]);
    let calls = camera.calls();
    let worker = CaptureWorker::new(camera, relay, gain, tx, shutdown);
    std::thread::spawn(move || worker.run())
        .join()
        .expect("worker thread panicked");

    let calls = calls.lock().unwrap();
    let applied: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            Call::SetGain(v) => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(applied, vec![75.0]);

    let first_wait = calls
        .iter()
        .position(|c| matches!(c, Call::WaitFrame))
        .unwrap();
    let gain_at = calls
        .iter()
        .position(|c| matches!(c, Call::SetGain(_)))
        .unwrap();
    assert!(gain_at < first_wait);
}
