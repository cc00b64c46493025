//! Single-frame camera capture over V4L2.
//!
//! A [`Camera`] owns the device file descriptor; dropping it closes the
//! device. Use [`Camera::with_device`] to scope an open/capture/release
//! sequence so the device is released on every exit path.

use crate::frame::{self, Frame};
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Requested capture resolution; the driver may negotiate something else.
const REQUESTED_WIDTH: u32 = 640;
const REQUESTED_HEIGHT: u32 = 480;
/// Upper bound on frames read while waiting for a non-dark frame.
const MAX_DARK_FRAMES: usize = 10;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("no camera at {0}")]
    DeviceNotFound(String),
    #[error("frame capture failed: {0}")]
    CaptureFailed(String),
    #[error("camera is in use by another process")]
    DeviceBusy,
    #[error("unusable capture format: {0}")]
    FormatNegotiationFailed(String),
    #[error("device does not support video capture")]
    StreamingNotSupported,
}

/// A capture-capable video device found by [`Camera::list_devices`].
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

/// Pixel layout of the buffers the driver hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed (2 bytes/pixel).
    Yuyv,
    /// Motion-JPEG, one JPEG image per buffer.
    Mjpeg,
    /// 8-bit grayscale.
    Grey,
    /// 16-bit little-endian grayscale.
    Y16,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            b"GREY" => Some(Self::Grey),
            b"Y16 " | b"Y16\0" => Some(Self::Y16),
            _ => None,
        }
    }
}

/// An open camera. The device is closed when this is dropped.
pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pub fourcc: FourCC,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a capture device (e.g. "/dev/video0") and request 640x480 YUYV.
    pub fn open(device_path: &str) -> Result<Self, CameraError> {
        let (device, caps) = probe(device_path)?;

        let requested = v4l::Format::new(REQUESTED_WIDTH, REQUESTED_HEIGHT, FourCC::new(b"YUYV"));
        let granted = device
            .set_format(&requested)
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("{device_path}: {e}")))?;
        let pixel_format = PixelFormat::from_fourcc(granted.fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "driver offered {:?}; expected YUYV, MJPG, GREY or Y16",
                granted.fourcc
            ))
        })?;

        tracing::info!(
            device = device_path,
            card = %caps.card,
            width = granted.width,
            height = granted.height,
            format = ?pixel_format,
            "camera opened"
        );

        Ok(Self {
            device,
            width: granted.width,
            height: granted.height,
            device_path: device_path.to_string(),
            fourcc: granted.fourcc,
            pixel_format,
        })
    }

    /// Open the device, run `f`, and release the device whatever `f` returns.
    pub fn with_device<T>(
        device_path: &str,
        f: impl FnOnce(&Camera) -> Result<T, CameraError>,
    ) -> Result<T, CameraError> {
        let camera = Camera::open(device_path)?;
        let result = f(&camera);
        drop(camera);
        result
    }

    /// Capture a single RGB frame after discarding `warmup` frames.
    ///
    /// Dark frames after warmup are skipped (bounded) while auto-exposure settles;
    /// if none brighten, the last frame is returned as-is.
    pub fn capture_frame(&self, warmup: usize) -> Result<Frame, CameraError> {
        let mut stream =
            MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4).map_err(|e| {
                CameraError::CaptureFailed(format!("mmap stream setup: {e}"))
            })?;

        for _ in 0..warmup {
            stream.next().map_err(|e| {
                CameraError::CaptureFailed(format!("warmup dequeue: {e}"))
            })?;
        }

        let mut last = None;
        for _ in 0..MAX_DARK_FRAMES {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CameraError::CaptureFailed(format!("dequeue: {e}")))?;

            let rgb = self.buf_to_rgb(buf)?;
            let is_dark = frame::is_dark_frame(&rgb, 0.95);
            let frame = Frame {
                data: rgb,
                width: self.width,
                height: self.height,
                sequence: meta.sequence,
                is_dark,
            };
            if !is_dark {
                return Ok(frame);
            }
            tracing::debug!(sequence = meta.sequence, "dark frame discarded");
            last = Some(frame);
        }

        last.ok_or_else(|| CameraError::CaptureFailed("no frame captured".into()))
    }

    /// Convert a raw buffer to RGB based on the negotiated format.
    fn buf_to_rgb(&self, buf: &[u8]) -> Result<Vec<u8>, CameraError> {
        let converted = match self.pixel_format {
            PixelFormat::Yuyv => frame::yuyv_to_rgb(buf, self.width, self.height),
            PixelFormat::Grey => frame::grey_to_rgb(buf, self.width, self.height),
            PixelFormat::Y16 => frame::y16_to_rgb(buf, self.width, self.height),
            PixelFormat::Mjpeg => {
                return image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)
                    .map(|img| img.to_rgb8().into_raw())
                    .map_err(|e| CameraError::CaptureFailed(format!("MJPEG decode failed: {e}")));
            }
        };
        converted.map_err(|e| CameraError::CaptureFailed(format!("{:?} conversion failed: {e}", self.pixel_format)))
    }

    /// Every `/dev/videoN` node that supports video capture.
    pub fn list_devices() -> Vec<DeviceInfo> {
        (0..16)
            .map(|n| format!("/dev/video{n}"))
            .filter_map(|path| {
                let (_, caps) = probe(&path).ok()?;
                Some(DeviceInfo {
                    name: caps.card,
                    driver: caps.driver,
                    bus: caps.bus,
                    path,
                })
            })
            .collect()
    }
}

/// errno for a device held open elsewhere.
const EBUSY: i32 = 16;

/// Open a device node and confirm it can capture video.
fn probe(path: &str) -> Result<(Device, v4l::Capabilities), CameraError> {
    if !Path::new(path).exists() {
        return Err(CameraError::DeviceNotFound(path.to_string()));
    }
    let device = Device::with_path(path).map_err(|e| match e.raw_os_error() {
        Some(EBUSY) => CameraError::DeviceBusy,
        _ => CameraError::DeviceNotFound(format!("{path}: {e}")),
    })?;
    let caps = device
        .query_caps()
        .map_err(|e| CameraError::CaptureFailed(format!("{path}: capability query: {e}")))?;
    if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
        return Err(CameraError::StreamingNotSupported);
    }
    Ok((device, caps))
}

impl Drop for Camera {
    fn drop(&mut self) {
        tracing::debug!(device = %self.device_path, "camera released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_from_fourcc() {
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"YUYV")), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"MJPG")), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"Y16 ")), Some(PixelFormat::Y16));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"NV12")), None);
    }

    #[test]
    fn test_open_missing_device() {
        let err = Camera::open("/dev/rollcall-no-such-camera").unwrap_err();
        assert!(matches!(err, CameraError::DeviceNotFound(_)));
    }
}
