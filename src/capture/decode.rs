//! Raw wire formats to the fixed RGB8 grid.

use jpeg_decoder::Decoder;

use super::frame::{Frame, PixelFormat, FRAME_BYTES, FRAME_HEIGHT, FRAME_WIDTH};
use crate::error::CameraError;

/// Decode one raw buffer from the device into the fixed pixel grid.
///
/// A malformed buffer (truncated MJPEG, short YUYV) is reported as
/// [`CameraError::FrameUnavailable`]: the frame is unusable but the stream
/// itself is fine, so the capture loop treats it like a missed cycle.
pub fn decode_frame(data: &[u8], format: PixelFormat) -> Result<Frame, CameraError> {
    match format {
        PixelFormat::Rgb24 => Frame::from_rgb8(data.to_vec()),
        PixelFormat::Mjpeg => {
            let mut decoder = Decoder::new(data);
            let pixels = decoder.decode().map_err(|e| {
                tracing::debug!(error = %e, "mjpeg decode failed, dropping frame");
                CameraError::FrameUnavailable
            })?;
            Frame::from_rgb8(pixels).map_err(|_| CameraError::FrameUnavailable)
        }
        PixelFormat::Yuyv => yuyv_to_rgb(data),
    }
}

/// YUYV 4:2:2 to RGB8. Two pixels per four bytes, chroma shared.
fn yuyv_to_rgb(data: &[u8]) -> Result<Frame, CameraError> {
    // 2 bytes per pixel on the wire
    if data.len() < FRAME_WIDTH * FRAME_HEIGHT * 2 {
        return Err(CameraError::FrameUnavailable);
    }

    let mut rgb = Vec::with_capacity(FRAME_BYTES);
    for chunk in data[..FRAME_WIDTH * FRAME_HEIGHT * 2].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        push_rgb(&mut rgb, y0, u, v);
        push_rgb(&mut rgb, y1, u, v);
    }
    Frame::from_rgb8(rgb)
}

// BT.601 integer approximation
fn push_rgb(out: &mut Vec<u8>, y: u8, u: u8, v: u8) {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    out.push(r.clamp(0, 255) as u8);
    out.push(g.clamp(0, 255) as u8);
    out.push(b.clamp(0, 255) as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb24_passthrough_keeps_bytes() {
        let raw = vec![200u8; FRAME_BYTES];
        let frame = decode_frame(&raw, PixelFormat::Rgb24).unwrap();
        assert!(frame.as_bytes().iter().all(|&b| b == 200));
    }

    #[test]
    fn short_yuyv_buffer_is_a_dropped_frame() {
        let err = decode_frame(&[0u8; 16], PixelFormat::Yuyv).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn yuyv_grey_decodes_to_grey() {
        // Y=128, U=V=128 is mid-grey in BT.601
        let mut raw = Vec::with_capacity(FRAME_WIDTH * FRAME_HEIGHT * 2);
        for _ in 0..FRAME_WIDTH * FRAME_HEIGHT / 2 {
            raw.extend_from_slice(&[128, 128, 128, 128]);
        }
        let frame = decode_frame(&raw, PixelFormat::Yuyv).unwrap();
        for px in frame.as_bytes().chunks(3) {
            assert_eq!(px[0], px[1]);
            assert_eq!(px[1], px[2]);
            assert!(px[0] > 120 && px[0] < 140);
        }
    }

    #[test]
    fn truncated_mjpeg_is_a_dropped_frame() {
        let err = decode_frame(&[0xFF, 0xD8, 0x00], PixelFormat::Mjpeg).unwrap_err();
        assert!(err.is_transient());
    }
}
