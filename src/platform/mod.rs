//! Capture hardware abstraction.
//!
//! The session controller never talks to a camera stack directly; it calls
//! into a [`CaptureBackend`] and a [`MediaComposer`] supplied by the host.

mod backend;
pub mod selection;
mod types;

pub use backend::{CaptureBackend, MediaComposer};
pub use selection::{resolve_device, resolve_preset, ZoomLimits};
pub use types::{
    CameraPosition, DeviceInfo, DeviceKind, FocusPoint, MovieSettings, OutputKind, PhotoSettings,
    SessionPreset, StabilizationMode, VideoCodec, VideoOrientation,
};
