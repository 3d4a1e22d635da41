use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CameraError;

/// Fixed stream geometry. The whole pipeline is sized around one shape;
/// the relay slot, the decoder output and the display texture all assume it.
pub const FRAME_WIDTH: usize = 640;
pub const FRAME_HEIGHT: usize = 480;
pub const FRAME_CHANNELS: usize = 3;
pub const FRAME_BYTES: usize = FRAME_WIDTH * FRAME_HEIGHT * FRAME_CHANNELS;

/// One decoded RGB8 image at the fixed stream geometry.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
}

impl Frame {
    /// Zero-filled frame, used to seed the relay before the first capture.
    pub fn black() -> Self {
        Self {
            data: vec![0; FRAME_BYTES],
        }
    }

    /// Wrap decoded RGB8 bytes. Length must match the fixed geometry exactly.
    pub fn from_rgb8(data: Vec<u8>) -> Result<Self, CameraError> {
        if data.len() != FRAME_BYTES {
            return Err(CameraError::Device(format!(
                "decoded frame is {} bytes, expected {}",
                data.len(),
                FRAME_BYTES
            )));
        }
        Ok(Self { data })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// In-place overwrite, reusing the existing allocation.
    pub fn copy_from(&mut self, other: &Frame) {
        self.data.copy_from_slice(&other.data);
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &FRAME_WIDTH)
            .field("height", &FRAME_HEIGHT)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Raw wire formats we accept from the device before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Rgb24,
    Yuyv,
    Mjpeg,
}
