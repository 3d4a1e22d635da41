//! Error taxonomy for the capture path and operator controls.
//!
//! Errors raised inside the background capture loop never cross into the UI
//! thread as panics or early returns; they travel as values over the worker
//! event channel or are swallowed per variant (see `capture::worker`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CameraError {
    /// No compatible color camera attached, or the stream failed to start.
    /// Fatal to the capture path; the window stays open with a dead feed.
    #[error("no compatible color camera found")]
    DeviceNotFound,

    /// No color frame arrived within this cycle. Transient: the worker skips
    /// the iteration without touching the relay.
    #[error("no color frame available this cycle")]
    FrameUnavailable,

    /// Operator gain outside the accepted range. Rejected at the submission
    /// boundary; shared state is untouched.
    #[error("gain {value} outside accepted range [0, 128]")]
    GainOutOfRange { value: f32 },

    /// Operator gain input failed to parse as a number.
    #[error("gain input {input:?} is not a number")]
    GainNotNumeric { input: String },

    /// Anything else the device reports while applying settings or reading
    /// frames.
    #[error("device error: {0}")]
    Device(String),
}

impl CameraError {
    /// Transient errors are skipped by the capture loop; everything else
    /// terminates it.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::FrameUnavailable)
    }
}
