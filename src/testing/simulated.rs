//! In-process capture backend for offline testing and demos
//!
//! [`SimulatedBackend`] keeps its hardware state behind a shared
//! [`BackendProbe`] so tests can inject failures and inspect what the session
//! did. Recordings are real files in the session's temp directory whose
//! content records the camera and measured duration of each segment.

use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;

use crate::errors::CaptureError;
use crate::platform::{
    CameraPosition, CaptureBackend, DeviceInfo, DeviceKind, FocusPoint, MediaComposer,
    MovieSettings, OutputKind, PhotoSettings, SessionPreset, VideoCodec,
};
use crate::recording::Segment;
use crate::timing::Clock;

/// A hardware call observed by the simulated backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    BeginConfiguration,
    CommitConfiguration,
    AddVideoInput(String),
    RemoveVideoInput(String),
    AddAudioInput,
    RemoveAudioInput,
    AddOutput(OutputKind),
    SetPreset(SessionPreset),
    StartRunning,
    StopRunning,
    SetZoom(f32),
    SetFocus(FocusPoint),
    SetTorch(bool),
    CapturePhoto(PhotoSettings),
    StartRecording(PathBuf, MovieSettings),
    StopRecording(Duration),
}

#[derive(Debug, Default)]
struct ProbeState {
    calls: Vec<BackendCall>,
    config_depth: u32,
    unbracketed_changes: u32,
    video_inputs: Vec<String>,
    audio_input: bool,
    outputs: HashSet<OutputKind>,
    preset: Option<SessionPreset>,
    running: bool,
    torch: bool,
    zoom: f32,
    recording: Option<(PathBuf, CameraPosition, Duration)>,
    rejected_inputs: HashSet<String>,
    unsupported_session_presets: HashSet<SessionPreset>,
    fail_photo: bool,
    fail_lock: bool,
    fail_record_start: bool,
}

/// Shared view into a [`SimulatedBackend`].
#[derive(Debug, Clone, Default)]
pub struct BackendProbe {
    inner: Arc<Mutex<ProbeState>>,
}

impl BackendProbe {
    fn state(&self) -> MutexGuard<'_, ProbeState> {
        self.inner.lock().expect("lock poisoned")
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    /// Input or output changes made outside a configuration transaction.
    pub fn unbracketed_changes(&self) -> u32 {
        self.state().unbracketed_changes
    }

    pub fn video_inputs(&self) -> Vec<String> {
        self.state().video_inputs.clone()
    }

    pub fn has_audio_input(&self) -> bool {
        self.state().audio_input
    }

    pub fn preset(&self) -> Option<SessionPreset> {
        self.state().preset
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn is_recording(&self) -> bool {
        self.state().recording.is_some()
    }

    pub fn torch(&self) -> bool {
        self.state().torch
    }

    pub fn zoom(&self) -> f32 {
        self.state().zoom
    }

    /// Refuse to attach the device with this id.
    pub fn reject_input(&self, device_id: &str) {
        self.state().rejected_inputs.insert(device_id.to_string());
    }

    pub fn reject_session_preset(&self, preset: SessionPreset) {
        self.state().unsupported_session_presets.insert(preset);
    }

    pub fn fail_photos(&self, fail: bool) {
        self.state().fail_photo = fail;
    }

    /// Make zoom, focus, and torch changes fail to lock the device.
    pub fn fail_device_lock(&self, fail: bool) {
        self.state().fail_lock = fail;
    }

    pub fn fail_record_start(&self, fail: bool) {
        self.state().fail_record_start = fail;
    }

    /// Drop an output as if the host tore it down.
    pub fn detach_output(&self, output: OutputKind) {
        self.state().outputs.remove(&output);
    }

    fn record(&self, call: BackendCall) {
        self.state().calls.push(call);
    }
}

/// Capture backend that simulates cameras, a microphone, and file outputs.
pub struct SimulatedBackend {
    cameras: Vec<DeviceInfo>,
    microphone: bool,
    codecs: Vec<VideoCodec>,
    clock: Arc<dyn Clock>,
    probe: BackendProbe,
}

impl SimulatedBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cameras: standard_cameras(),
            microphone: true,
            codecs: vec![VideoCodec::H264, VideoCodec::Hevc],
            clock,
            probe: BackendProbe::default(),
        }
    }

    pub fn with_cameras(mut self, cameras: Vec<DeviceInfo>) -> Self {
        self.cameras = cameras;
        self
    }

    pub fn without_microphone(mut self) -> Self {
        self.microphone = false;
        self
    }

    pub fn with_codecs(mut self, codecs: Vec<VideoCodec>) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn probe(&self) -> BackendProbe {
        self.probe.clone()
    }

    fn configuration_change(&self, call: BackendCall) {
        let mut state = self.probe.state();
        if state.config_depth == 0 {
            state.unbracketed_changes += 1;
        }
        state.calls.push(call);
    }

    fn lock_device(&self) -> Result<(), CaptureError> {
        if self.probe.state().fail_lock {
            return Err(CaptureError::HardwareLockFailed(
                "device is locked by another client".to_string(),
            ));
        }
        Ok(())
    }
}

/// A back wide-angle camera, a back triple camera, and a front wide-angle camera.
pub fn standard_cameras() -> Vec<DeviceInfo> {
    let presets = vec![
        SessionPreset::Vga640x480,
        SessionPreset::Hd1280x720,
        SessionPreset::Hd1920x1080,
    ];
    vec![
        DeviceInfo {
            id: "sim-back-wide".to_string(),
            name: "Simulated Back Camera".to_string(),
            position: CameraPosition::Back,
            kind: DeviceKind::WideAngle,
            has_flash: true,
            has_torch: true,
            min_zoom: 1.0,
            max_zoom: 16.0,
            default_zoom: 1.0,
            supported_presets: presets.clone(),
        },
        DeviceInfo {
            id: "sim-back-triple".to_string(),
            name: "Simulated Back Triple Camera".to_string(),
            position: CameraPosition::Back,
            kind: DeviceKind::Triple,
            has_flash: true,
            has_torch: true,
            min_zoom: 1.0,
            max_zoom: 123.0,
            default_zoom: 2.0,
            supported_presets: {
                let mut p = presets.clone();
                p.push(SessionPreset::Hd4k3840x2160);
                p
            },
        },
        DeviceInfo {
            id: "sim-front-wide".to_string(),
            name: "Simulated Front Camera".to_string(),
            position: CameraPosition::Front,
            kind: DeviceKind::WideAngle,
            has_flash: false,
            has_torch: false,
            min_zoom: 1.0,
            max_zoom: 4.0,
            default_zoom: 1.0,
            supported_presets: presets,
        },
    ]
}

impl CaptureBackend for SimulatedBackend {
    fn discover_cameras(&self) -> Vec<DeviceInfo> {
        self.cameras.clone()
    }

    fn microphone_available(&self) -> bool {
        self.microphone
    }

    fn begin_configuration(&mut self) {
        let mut state = self.probe.state();
        state.config_depth += 1;
        state.calls.push(BackendCall::BeginConfiguration);
    }

    fn commit_configuration(&mut self) {
        let mut state = self.probe.state();
        state.config_depth = state.config_depth.saturating_sub(1);
        state.calls.push(BackendCall::CommitConfiguration);
    }

    fn add_video_input(&mut self, device: &DeviceInfo) -> Result<(), CaptureError> {
        self.configuration_change(BackendCall::AddVideoInput(device.id.clone()));
        let mut state = self.probe.state();
        if state.rejected_inputs.contains(&device.id) {
            return Err(CaptureError::ConfigurationRejected(format!(
                "input {} cannot be added",
                device.id
            )));
        }
        if !state.video_inputs.is_empty() {
            return Err(CaptureError::ConfigurationRejected(
                "a video input is already attached".to_string(),
            ));
        }
        state.video_inputs.push(device.id.clone());
        Ok(())
    }

    fn remove_video_input(&mut self, device: &DeviceInfo) {
        self.configuration_change(BackendCall::RemoveVideoInput(device.id.clone()));
        self.probe.state().video_inputs.retain(|id| id != &device.id);
    }

    fn add_audio_input(&mut self) -> Result<(), CaptureError> {
        if !self.microphone {
            return Err(CaptureError::DeviceUnavailable("no microphone".to_string()));
        }
        self.configuration_change(BackendCall::AddAudioInput);
        self.probe.state().audio_input = true;
        Ok(())
    }

    fn remove_audio_input(&mut self) {
        self.configuration_change(BackendCall::RemoveAudioInput);
        self.probe.state().audio_input = false;
    }

    fn add_output(&mut self, output: OutputKind) -> Result<(), CaptureError> {
        self.configuration_change(BackendCall::AddOutput(output));
        self.probe.state().outputs.insert(output);
        Ok(())
    }

    fn has_output(&self, output: OutputKind) -> bool {
        self.probe.state().outputs.contains(&output)
    }

    fn can_set_preset(&self, preset: SessionPreset) -> bool {
        !self
            .probe
            .state()
            .unsupported_session_presets
            .contains(&preset)
    }

    fn set_preset(&mut self, preset: SessionPreset) {
        self.configuration_change(BackendCall::SetPreset(preset));
        self.probe.state().preset = Some(preset);
    }

    fn start_running(&mut self) {
        let mut state = self.probe.state();
        state.running = true;
        state.calls.push(BackendCall::StartRunning);
    }

    fn stop_running(&mut self) {
        let mut state = self.probe.state();
        state.running = false;
        state.calls.push(BackendCall::StopRunning);
    }

    fn is_running(&self) -> bool {
        self.probe.state().running
    }

    fn set_zoom(&mut self, _device: &DeviceInfo, factor: f32) -> Result<(), CaptureError> {
        self.lock_device()?;
        let mut state = self.probe.state();
        state.zoom = factor;
        state.calls.push(BackendCall::SetZoom(factor));
        Ok(())
    }

    fn set_focus(&mut self, _device: &DeviceInfo, point: FocusPoint) -> Result<(), CaptureError> {
        self.lock_device()?;
        self.probe.record(BackendCall::SetFocus(point));
        Ok(())
    }

    fn set_torch(&mut self, device: &DeviceInfo, on: bool) -> Result<(), CaptureError> {
        if !device.has_torch {
            return Err(CaptureError::DeviceUnavailable(format!("{} has no torch", device.id)));
        }
        self.lock_device()?;
        let mut state = self.probe.state();
        state.torch = on;
        state.calls.push(BackendCall::SetTorch(on));
        Ok(())
    }

    fn available_codecs(&self) -> Vec<VideoCodec> {
        self.codecs.clone()
    }

    fn capture_photo(&mut self, settings: &PhotoSettings) -> Result<Bytes, CaptureError> {
        self.probe.record(BackendCall::CapturePhoto(settings.clone()));
        let state = self.probe.state();
        if state.fail_photo {
            return Err(CaptureError::ConfigurationRejected(
                "photo output connection lost".to_string(),
            ));
        }
        if state.video_inputs.is_empty() {
            return Err(CaptureError::DeviceUnavailable("no video input".to_string()));
        }

        // JPEG markers around a readable payload.
        let mut data = vec![0xFF, 0xD8];
        data.extend_from_slice(
            format!(
                "{} flash={} mirrored={} orientation={:?}",
                state.video_inputs[0], settings.flash, settings.mirrored, settings.orientation
            )
            .as_bytes(),
        );
        data.extend_from_slice(&[0xFF, 0xD9]);
        Ok(Bytes::from(data))
    }

    fn start_recording(
        &mut self,
        path: &Path,
        settings: &MovieSettings,
    ) -> Result<(), CaptureError> {
        self.probe
            .record(BackendCall::StartRecording(path.to_path_buf(), settings.clone()));
        let position = {
            let state = self.probe.state();
            if state.fail_record_start {
                return Err(CaptureError::ConfigurationRejected(
                    "movie output refused to start".to_string(),
                ));
            }
            if state.recording.is_some() {
                return Err(CaptureError::ConfigurationRejected(
                    "already recording".to_string(),
                ));
            }
            let input = state
                .video_inputs
                .first()
                .ok_or_else(|| CaptureError::DeviceUnavailable("no video input".to_string()))?;
            self.cameras
                .iter()
                .find(|d| &d.id == input)
                .map(|d| d.position)
                .ok_or_else(|| CaptureError::DeviceUnavailable(input.clone()))?
        };

        fs::File::create(path)?;
        self.probe.state().recording = Some((path.to_path_buf(), position, self.clock.now()));
        Ok(())
    }

    fn is_recording(&self) -> bool {
        self.probe.state().recording.is_some()
    }

    fn stop_recording(&mut self) -> Result<Duration, CaptureError> {
        let Some((path, position, started)) = self.probe.state().recording.take() else {
            return Err(CaptureError::ConfigurationRejected("not recording".to_string()));
        };
        let duration = self.clock.now().saturating_sub(started);

        let mut file = fs::OpenOptions::new().append(true).open(&path)?;
        writeln!(file, "{} {}ms", position.as_str(), duration.as_millis())?;

        self.probe.record(BackendCall::StopRecording(duration));
        Ok(duration)
    }
}

/// Composer that joins segment files byte-for-byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatComposer;

impl MediaComposer for ConcatComposer {
    fn concatenate(&self, segments: &[Segment], output: &Path) -> Result<Duration, CaptureError> {
        let mut out = fs::File::create(output)?;
        for segment in segments {
            let data = fs::read(&segment.path).map_err(|e| {
                CaptureError::MergeFailed(format!("cannot read {:?}: {}", segment.path, e))
            })?;
            out.write_all(&data)?;
        }
        out.flush()?;
        Ok(segments.iter().map(|s| s.duration).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{StabilizationMode, VideoOrientation};
    use crate::timing::ManualClock;

    fn movie_settings() -> MovieSettings {
        MovieSettings {
            orientation: VideoOrientation::Portrait,
            stabilization: Some(StabilizationMode::Auto),
            codec: None,
            mirrored: false,
        }
    }

    #[test]
    fn test_unbracketed_changes_counted() {
        let mut backend = SimulatedBackend::new(Arc::new(ManualClock::new()));
        let probe = backend.probe();
        let cameras = backend.discover_cameras();

        backend.begin_configuration();
        backend.add_video_input(&cameras[0]).unwrap();
        backend.commit_configuration();
        assert_eq!(probe.unbracketed_changes(), 0);

        backend.remove_video_input(&cameras[0]);
        assert_eq!(probe.unbracketed_changes(), 1);
        assert!(probe.video_inputs().is_empty());
    }

    #[test]
    fn test_recording_measures_clock() {
        let clock = ManualClock::new();
        let mut backend = SimulatedBackend::new(Arc::new(clock.clone()));
        let cameras = backend.discover_cameras();
        backend.begin_configuration();
        backend.add_video_input(&cameras[2]).unwrap();
        backend.commit_configuration();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg.mp4");
        backend.start_recording(&path, &movie_settings()).unwrap();
        clock.advance(Duration::from_millis(1250));
        let duration = backend.stop_recording().unwrap();

        assert_eq!(duration, Duration::from_millis(1250));
        assert_eq!(fs::read_to_string(&path).unwrap(), "front 1250ms\n");
        assert!(backend.stop_recording().is_err());
    }

    #[test]
    fn test_lock_failure() {
        let mut backend = SimulatedBackend::new(Arc::new(ManualClock::new()));
        let probe = backend.probe();
        let cameras = backend.discover_cameras();
        probe.fail_device_lock(true);
        assert!(matches!(
            backend.set_zoom(&cameras[0], 2.0),
            Err(CaptureError::HardwareLockFailed(_))
        ));
    }
}
