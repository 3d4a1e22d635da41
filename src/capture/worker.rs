//! The capture loop: poll pending gain, wait for a frame, publish.
//!
//! Runs on its own execution context (the blocking pool in `main`). Nothing
//! here ever unwinds into the UI thread: terminal failures stop the session
//! and leave as a [`WorkerEvent`]; transient ones are skipped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::camera::ColorCamera;
use crate::pipeline::{FrameRelay, GainControl};

/// Status events the worker reports to the UI thread.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// The sensor refused a gain value that passed boundary validation.
    GainRejected { value: f32, reason: String },
    /// The capture loop ended. `reason` is `None` on a requested shutdown.
    Stopped { reason: Option<String> },
}

pub struct CaptureWorker<C: ColorCamera> {
    camera: C,
    relay: Arc<FrameRelay>,
    gain: Arc<GainControl>,
    events: flume::Sender<WorkerEvent>,
    shutdown: Arc<AtomicBool>,
}

impl<C: ColorCamera> CaptureWorker<C> {
    /// The camera must already be streaming; open failures are handled before
    /// a worker exists so they can surface as `DeviceNotFound`.
    pub fn new(
        camera: C,
        relay: Arc<FrameRelay>,
        gain: Arc<GainControl>,
        events: flume::Sender<WorkerEvent>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            camera,
            relay,
            gain,
            events,
            shutdown,
        }
    }

    /// Run until shutdown or a terminal device error. The session is stopped
    /// on every exit path out of the loop.
    pub fn run(mut self) {
        info!("capture loop started");
        let reason = self.pump();
        self.camera.stop();
        let _ = self.events.send(WorkerEvent::Stopped { reason });
        info!("capture loop stopped");
    }

    fn pump(&mut self) -> Option<String> {
        while !self.shutdown.load(Ordering::Relaxed) {
            // Gain first: an applied value takes effect with the next
            // captured frame, never the one already in flight.
            if let Some(value) = self.gain.poll_and_clear() {
                match self.camera.set_gain(value) {
                    Ok(()) => info!(gain = value, "sensor gain applied"),
                    Err(e) => {
                        warn!(gain = value, error = %e, "sensor rejected gain");
                        let _ = self.events.send(WorkerEvent::GainRejected {
                            value,
                            reason: e.to_string(),
                        });
                    }
                }
            }

            match self.camera.wait_frame() {
                Ok(frame) => {
                    // Lock is held only for the copy; the device wait above
                    // happened outside it.
                    self.relay.publish(&frame);
                    metrics::counter!("frames_published").increment(1);
                }
                Err(e) if e.is_transient() => {
                    debug!("no color frame this cycle");
                }
                Err(e) => {
                    error!(error = %e, "capture failed, stopping session");
                    return Some(e.to_string());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::testing::{Call, ScriptedCamera, Step};

    fn harness() -> (
        Arc<FrameRelay>,
        Arc<GainControl>,
        flume::Receiver<WorkerEvent>,
        flume::Sender<WorkerEvent>,
        Arc<AtomicBool>,
    ) {
        let (tx, rx) = flume::unbounded();
        (
            Arc::new(FrameRelay::new()),
            Arc::new(GainControl::new()),
            rx,
            tx,
            Arc::new(AtomicBool::new(false)),
        )
    }

    #[test]
    fn publishes_each_captured_frame() {
        let (relay, gain, rx, tx, shutdown) = harness();
        let camera = ScriptedCamera::new(vec![Step::Frame(10), Step::Frame(20)]);
        CaptureWorker::new(camera, Arc::clone(&relay), gain, tx, shutdown).run();

        let mut out = crate::capture::frame::Frame::black();
        assert_eq!(relay.snapshot(&mut out), 2);
        assert!(out.as_bytes().iter().all(|&b| b == 20));
        assert!(matches!(
            rx.try_recv().unwrap(),
            WorkerEvent::Stopped { reason: Some(_) }
        ));
    }

    #[test]
    fn unavailable_frame_skips_without_touching_the_relay() {
        let (relay, gain, _rx, tx, shutdown) = harness();
        let camera = ScriptedCamera::new(vec![Step::Skip, Step::Skip, Step::Frame(5)]);
        CaptureWorker::new(camera, Arc::clone(&relay), gain, tx, shutdown).run();
        assert_eq!(relay.seq(), 1);
    }

    #[test]
    fn gain_is_applied_before_the_next_frame_wait() {
        let (relay, gain, _rx, tx, shutdown) = harness();
        let camera = ScriptedCamera::new(vec![Step::Frame(1)]);
        let calls = camera.calls();

        gain.request(16.0).unwrap();
        CaptureWorker::new(camera, relay, gain, tx, shutdown).run();

        let calls = calls.lock().unwrap();
        let set_at = calls
            .iter()
            .position(|c| matches!(c, Call::SetGain(_)))
            .unwrap();
        let wait_at = calls
            .iter()
            .position(|c| matches!(c, Call::WaitFrame))
            .unwrap();
        assert!(set_at < wait_at, "gain must precede the frame wait");
        // Exactly one apply: the dirty flag cleared on the first poll.
        assert_eq!(
            calls
                .iter()
                .filter(|c| matches!(c, Call::SetGain(_)))
                .count(),
            1
        );
    }

    #[test]
    fn rejected_gain_is_reported_and_the_loop_continues() {
        let (relay, gain, rx, tx, shutdown) = harness();
        let camera = ScriptedCamera::new(vec![Step::Frame(3)]).rejecting_gain();

        gain.request(32.0).unwrap();
        CaptureWorker::new(camera, Arc::clone(&relay), gain, tx, shutdown).run();

        assert!(matches!(
            rx.try_recv().unwrap(),
            WorkerEvent::GainRejected { value, .. } if value == 32.0
        ));
        assert_eq!(relay.seq(), 1, "frame after the rejection still lands");
    }

    #[test]
    fn shutdown_flag_stops_the_session_cleanly() {
        let (relay, gain, rx, tx, shutdown) = harness();
        let camera = ScriptedCamera::new(vec![Step::Frame(1)]);
        let calls = camera.calls();

        shutdown.store(true, Ordering::Relaxed);
        CaptureWorker::new(camera, relay, gain, tx, shutdown).run();

        assert!(matches!(
            rx.try_recv().unwrap(),
            WorkerEvent::Stopped { reason: None }
        ));
        let calls = calls.lock().unwrap();
        assert!(!calls.iter().any(|c| matches!(c, Call::WaitFrame)));
        assert_eq!(calls.iter().filter(|c| matches!(c, Call::Stop)).count(), 1);
    }
}
