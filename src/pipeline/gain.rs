//! Operator gain requests, handed to the capture worker.
//!
//! One pending value, last-write-wins. The stored `Option` doubles as the
//! dirty flag: `take` under the lock gives the worker an atomic
//! read-test-clear, so a request is observed by exactly one poll and never
//! re-applied.

use std::sync::Mutex;

use tracing::debug;

use crate::error::CameraError;

pub const GAIN_MIN: f32 = 0.0;
pub const GAIN_MAX: f32 = 128.0;

pub struct GainControl {
    pending: Mutex<Option<f32>>,
}

impl GainControl {
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Store a validated gain request. Values outside [`GAIN_MIN`] ..=
    /// [`GAIN_MAX`] (NaN included) are rejected without touching the pending
    /// slot. A request made before a poll replaces any earlier one.
    pub fn request(&self, value: f32) -> Result<(), CameraError> {
        if !(GAIN_MIN..=GAIN_MAX).contains(&value) {
            return Err(CameraError::GainOutOfRange { value });
        }
        *self.pending.lock().unwrap() = Some(value);
        debug!(gain = value, "gain request queued");
        Ok(())
    }

    /// Parse operator input and delegate to [`request`](Self::request).
    /// Returns the parsed value so the caller can echo it back.
    pub fn parse_request(&self, input: &str) -> Result<f32, CameraError> {
        let value: f32 = input
            .trim()
            .parse()
            .map_err(|_| CameraError::GainNotNumeric {
                input: input.to_string(),
            })?;
        self.request(value)?;
        Ok(value)
    }

    /// Consume the pending request, if any. The take happens under the lock,
    /// so a concurrent `request` either lands before (and is returned here)
    /// or after (and is returned by the next poll), never half-observed.
    pub fn poll_and_clear(&self) -> Option<f32> {
        self.pending.lock().unwrap().take()
    }
}

impl Default for GainControl {
    fn default() -> Self {
        Self::new()
    }
}
