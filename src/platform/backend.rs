//! Capability surface the session controller drives.
//!
//! Implementations wrap a host capture stack. Every method is called from the
//! session's serial queue thread only, so implementations need `Send` but not
//! `Sync`.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;

use super::types::{
    DeviceInfo, FocusPoint, MovieSettings, OutputKind, PhotoSettings, SessionPreset, VideoCodec,
};
use crate::errors::CaptureError;
use crate::recording::Segment;

pub trait CaptureBackend: Send + 'static {
    /// All cameras the host exposes, in discovery order.
    fn discover_cameras(&self) -> Vec<DeviceInfo>;

    /// Whether a microphone exists and could be activated.
    fn microphone_available(&self) -> bool;

    /// Open a configuration transaction; changes apply atomically on commit.
    fn begin_configuration(&mut self);
    fn commit_configuration(&mut self);

    fn add_video_input(&mut self, device: &DeviceInfo) -> Result<(), CaptureError>;
    fn remove_video_input(&mut self, device: &DeviceInfo);
    fn add_audio_input(&mut self) -> Result<(), CaptureError>;
    fn remove_audio_input(&mut self);
    fn add_output(&mut self, output: OutputKind) -> Result<(), CaptureError>;
    fn has_output(&self, output: OutputKind) -> bool;

    fn can_set_preset(&self, preset: SessionPreset) -> bool;
    fn set_preset(&mut self, preset: SessionPreset);

    fn start_running(&mut self);
    fn stop_running(&mut self);
    fn is_running(&self) -> bool;

    fn set_zoom(&mut self, device: &DeviceInfo, factor: f32) -> Result<(), CaptureError>;
    fn set_focus(&mut self, device: &DeviceInfo, point: FocusPoint) -> Result<(), CaptureError>;
    fn set_torch(&mut self, device: &DeviceInfo, on: bool) -> Result<(), CaptureError>;

    /// Codecs the movie output can write.
    fn available_codecs(&self) -> Vec<VideoCodec>;

    /// Fire the shutter and return encoded image bytes.
    fn capture_photo(&mut self, settings: &PhotoSettings) -> Result<Bytes, CaptureError>;

    fn start_recording(&mut self, path: &Path, settings: &MovieSettings)
        -> Result<(), CaptureError>;
    fn is_recording(&self) -> bool;

    /// Finalize the current file and return its recorded duration.
    fn stop_recording(&mut self) -> Result<Duration, CaptureError>;
}

/// Joins recorded segments into one media file.
pub trait MediaComposer: Send + 'static {
    /// Concatenate `segments` in order into `output`, returning the merged duration.
    fn concatenate(&self, segments: &[Segment], output: &Path) -> Result<Duration, CaptureError>;
}
