//! rollcall-hw — Hardware abstraction for attendance capture.
//!
//! Devices are acquired per capture and released when the handle drops,
//! so a failed read never leaves a camera or microphone open.

pub mod camera;
pub mod frame;
pub mod microphone;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::Frame;
pub use microphone::{ListenOptions, Microphone, MicrophoneError, Utterance};
