//! Camera capability boundary and its V4L2 implementation.
//!
//! The capture worker only ever sees [`ColorCamera`]: open happens before the
//! worker spawns (so a start failure surfaces as `DeviceNotFound` without a
//! half-running loop), and the handle is moved into the worker afterwards.

use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::control::{Control, Value};
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::capture::Parameters;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::decode;
use super::frame::{Frame, PixelFormat, FRAME_HEIGHT, FRAME_WIDTH};
use crate::error::CameraError;
use crate::CaptureConfig;

// V4L2 control IDs (videodev2.h)
const CID_AUTO_WHITE_BALANCE: u32 = 0x0098_090c;
const CID_GAIN: u32 = 0x0098_0913;

const STREAM_BUFFERS: u32 = 4;

/// What the capture worker needs from a device: a stream of decoded color
/// frames, a gain knob, and an explicit session stop.
pub trait ColorCamera: Send {
    /// Block for the next color frame of the current cycle and decode it to
    /// the fixed grid. `FrameUnavailable` means this cycle produced nothing
    /// usable; the caller is expected to skip and retry.
    fn wait_frame(&mut self) -> Result<Frame, CameraError>;

    /// Apply a sensor gain value already validated at the request boundary.
    fn set_gain(&mut self, value: f32) -> Result<(), CameraError>;

    /// Stop the streaming session, releasing the device. Idempotent.
    fn stop(&mut self);
}

/// V4L2-backed color camera with a fixed stream configuration.
pub struct V4l2ColorCamera {
    device: Box<Device>,
    stream: Option<MmapStream<'static>>,
    format: PixelFormat,
}

impl V4l2ColorCamera {
    /// Open the configured device node (or the first color-capable node) with
    /// the fixed 640x480 stream, enable auto white balance, and start
    /// streaming. Any failure here is `DeviceNotFound`: the capture path is
    /// dead before it ever ran.
    pub fn open(config: &CaptureConfig) -> Result<Self, CameraError> {
        let path = match &config.device {
            Some(path) => path.clone(),
            None => first_color_device()?,
        };
        info!("Opening color camera: {}", path);

        let device = Device::with_path(&path).map_err(|e| {
            warn!(error = %e, "failed to open {}", path);
            CameraError::DeviceNotFound
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::Device(e.to_string()))?;
        info!("Device: {} ({})", caps.card, caps.driver);
        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(CameraError::DeviceNotFound);
        }

        let format = preferred_format(&device).ok_or(CameraError::DeviceNotFound)?;

        let mut fmt = device
            .format()
            .map_err(|e| CameraError::Device(e.to_string()))?;
        fmt.width = FRAME_WIDTH as u32;
        fmt.height = FRAME_HEIGHT as u32;
        fmt.fourcc = fourcc_of(format);
        let accepted = device.set_format(&fmt).map_err(|e| {
            warn!(error = %e, "failed to set stream format");
            CameraError::DeviceNotFound
        })?;
        if accepted.width != FRAME_WIDTH as u32 || accepted.height != FRAME_HEIGHT as u32 {
            warn!(
                "device refused fixed geometry, offered {}x{}",
                accepted.width, accepted.height
            );
            return Err(CameraError::DeviceNotFound);
        }

        if let Err(e) = device.set_params(&Parameters::with_fps(config.fps)) {
            // Plenty of UVC cameras reject rate changes; stream at whatever
            // the driver picked.
            warn!(error = %e, "failed to set frame rate, keeping driver default");
        }

        if let Err(e) = device.set_control(Control {
            id: CID_AUTO_WHITE_BALANCE,
            value: Value::Boolean(true),
        }) {
            warn!(error = %e, "auto white balance not accepted");
        }

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, STREAM_BUFFERS)
            .map_err(|e| {
                warn!(error = %e, "failed to start capture stream");
                CameraError::DeviceNotFound
            })?;

        info!(
            "Capture stream started: {}x{} {:?} with {} buffers",
            FRAME_WIDTH, FRAME_HEIGHT, format, STREAM_BUFFERS
        );

        Ok(Self {
            device: Box::new(device),
            stream: Some(stream),
            format,
        })
    }
}

impl ColorCamera for V4l2ColorCamera {
    fn wait_frame(&mut self) -> Result<Frame, CameraError> {
        let stream = self.stream.as_mut().ok_or(CameraError::FrameUnavailable)?;

        let started = Instant::now();
        let (buf, meta) = stream.next().map_err(|e| match e.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => {
                CameraError::FrameUnavailable
            }
            _ => CameraError::Device(e.to_string()),
        })?;

        if meta.bytesused == 0 {
            return Err(CameraError::FrameUnavailable);
        }

        // Copy out of the mmap'd buffer before it is requeued.
        let data = Bytes::copy_from_slice(&buf[..meta.bytesused as usize]);
        let frame = decode::decode_frame(&data[..], self.format)?;

        metrics::histogram!("capture_frame_us").record(started.elapsed().as_micros() as f64);
        Ok(frame)
    }

    fn set_gain(&mut self, value: f32) -> Result<(), CameraError> {
        self.device
            .set_control(Control {
                id: CID_GAIN,
                value: Value::Integer(value.round() as i64),
            })
            .map_err(|e| CameraError::Device(e.to_string()))
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            info!("Capture stream stopped");
        }
    }
}

impl Drop for V4l2ColorCamera {
    fn drop(&mut self) {
        // Backstop for exit paths that never reached an explicit stop.
        self.stop();
    }
}

/// Scan /dev/video0..9 for the first node that can capture color frames in a
/// format we decode.
fn first_color_device() -> Result<String, CameraError> {
    use std::path::Path;

    info!("Scanning for a color camera...");
    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        if let Ok(dev) = Device::with_path(&path) {
            if let Ok(caps) = dev.query_caps() {
                if caps.capabilities.contains(CapFlags::VIDEO_CAPTURE)
                    && preferred_format(&dev).is_some()
                {
                    info!("Found color camera: {} - {}", path, caps.card);
                    return Ok(path);
                }
            }
        }
        debug!("{} is not a usable color camera", path);
    }
    Err(CameraError::DeviceNotFound)
}

/// Pick the raw format we will request, preferring the cheapest decode path.
fn preferred_format(device: &Device) -> Option<PixelFormat> {
    let formats = device.enum_formats().ok()?;
    let has = |fourcc: &[u8; 4]| formats.iter().any(|f| f.fourcc == FourCC::new(fourcc));

    if has(b"RGB3") {
        Some(PixelFormat::Rgb24)
    } else if has(b"YUYV") {
        Some(PixelFormat::Yuyv)
    } else if has(b"MJPG") {
        Some(PixelFormat::Mjpeg)
    } else {
        None
    }
}

fn fourcc_of(format: PixelFormat) -> FourCC {
    match format {
        PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
        PixelFormat::Yuyv => FourCC::new(b"YUYV"),
        PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
    }
}
