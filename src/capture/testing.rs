//! Shared test doubles for the capture path.
//!
//! Used by the colocated worker tests and by the integration tests under
//! `tests/`. A [`ScriptedCamera`] plays back a fixed sequence of capture
//! outcomes and records every call made against it, so tests can assert both
//! what the worker published and in which order it drove the device.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::camera::ColorCamera;
use super::frame::{Frame, FRAME_BYTES};
use crate::error::CameraError;

/// Uniform frame of one byte value, the pattern all pipeline tests use:
/// any mix of two values inside a single read is a torn frame.
pub fn uniform_frame(value: u8) -> Frame {
    Frame::from_rgb8(vec![value; FRAME_BYTES]).expect("fixed-size vec")
}

/// One scripted `wait_frame` outcome.
pub enum Step {
    /// Produce a uniform frame of this value.
    Frame(u8),
    /// No frame this cycle (`FrameUnavailable`).
    Skip,
    /// Terminal device failure.
    Fail(&'static str),
}

/// Every call the worker made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    WaitFrame,
    SetGain(f32),
    Stop,
}

pub struct ScriptedCamera {
    script: VecDeque<Step>,
    calls: Arc<Mutex<Vec<Call>>>,
    reject_gain: bool,
}

impl ScriptedCamera {
    pub fn new(script: Vec<Step>) -> Self {
        Self {
            script: script.into(),
            calls: Arc::new(Mutex::new(Vec::new())),
            reject_gain: false,
        }
    }

    /// Make every `set_gain` fail with a device error.
    pub fn rejecting_gain(mut self) -> Self {
        self.reject_gain = true;
        self
    }

    /// Handle to the call log, usable after the camera moved into a worker.
    pub fn calls(&self) -> Arc<Mutex<Vec<Call>>> {
        Arc::clone(&self.calls)
    }
}

impl ColorCamera for ScriptedCamera {
    fn wait_frame(&mut self) -> Result<Frame, CameraError> {
        self.calls.lock().unwrap().push(Call::WaitFrame);
        match self.script.pop_front() {
            Some(Step::Frame(value)) => Ok(uniform_frame(value)),
            Some(Step::Skip) => Err(CameraError::FrameUnavailable),
            Some(Step::Fail(reason)) => Err(CameraError::Device(reason.into())),
            // Script exhausted: end the loop the way a dying device would.
            None => Err(CameraError::Device("script exhausted".into())),
        }
    }

    fn set_gain(&mut self, value: f32) -> Result<(), CameraError> {
        self.calls.lock().unwrap().push(Call::SetGain(value));
        if self.reject_gain {
            return Err(CameraError::Device("sensor rejected gain".into()));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.calls.lock().unwrap().push(Call::Stop);
    }
}
