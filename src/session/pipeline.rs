//! Queue-side half of the session.
//!
//! [`Pipeline`] owns the backend and is only ever touched from the serial
//! queue thread. Every hardware call and every segment list mutation happens
//! here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::events::SessionEvent;
use super::hook::{CaptureContinuation, DeferredAction};
use super::shared::Shared;
use super::state::{CaptureGate, PipelineState, RecordingState};
use super::timer::AutoStopTimer;
use crate::config::CameraConfig;
use crate::errors::CaptureError;
use crate::platform::{
    resolve_device, resolve_preset, CameraPosition, CaptureBackend, DeviceInfo, FocusPoint,
    MediaComposer, MovieSettings, OutputKind, PhotoSettings, SessionPreset, VideoOrientation,
    ZoomLimits,
};
use crate::recording::{discard, finalize_take, Segment, SegmentList, SegmentStore, TakeOutcome};

pub(crate) struct Pipeline {
    backend: Box<dyn CaptureBackend>,
    composer: Box<dyn MediaComposer>,
    store: SegmentStore,
    shared: Arc<Shared>,
    device: Option<DeviceInfo>,
    audio_attached: bool,
    zoom: Option<ZoomLimits>,
    segments: SegmentList,
    active_segment: Option<(PathBuf, CameraPosition)>,
    /// Orientation fixed by the first segment of the current take.
    take_orientation: Option<VideoOrientation>,
    auto_stop: Option<AutoStopTimer>,
    /// First segment of a take whose start was overtaken by a camera switch.
    pending_start: Option<(u64, Option<Duration>)>,
    /// Accepted take still under review; deleted on retake.
    last_artifact: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(
        backend: Box<dyn CaptureBackend>,
        composer: Box<dyn MediaComposer>,
        store: SegmentStore,
        shared: Arc<Shared>,
    ) -> Self {
        Self {
            backend,
            composer,
            store,
            shared,
            device: None,
            audio_attached: false,
            zoom: None,
            segments: SegmentList::new(),
            active_segment: None,
            take_orientation: None,
            auto_stop: None,
            pending_start: None,
            last_artifact: None,
        }
    }

    pub fn arm(&mut self) {
        let shared = Arc::clone(&self.shared);
        let cfg = &shared.config.camera;

        if shared.lock().pipeline != PipelineState::Unarmed {
            log::debug!("Pipeline already armed");
            return;
        }

        let cameras = self.backend.discover_cameras();
        let Some(device) = resolve_device(&cameras, cfg.device_position, cfg.enable_wide_cameras)
        else {
            log::warn!("No {} camera available", cfg.device_position.as_str());
            self.mark_unavailable();
            return;
        };

        self.backend.begin_configuration();
        if let Err(e) = self.backend.add_video_input(&device) {
            self.backend.commit_configuration();
            log::warn!("Video input rejected for {}: {}", device.id, e);
            self.mark_unavailable();
            return;
        }
        self.audio_attached = cfg.allow_record_video && self.attach_audio();
        for output in [OutputKind::Photo, OutputKind::Movie] {
            if let Err(e) = self.backend.add_output(output) {
                log::warn!("{:?} output rejected: {}", output, e);
            }
        }
        let preset = self.apply_preset(&device, cfg.session_preset);
        self.backend.commit_configuration();

        let zoom = ZoomLimits::for_device(&device, cfg.enable_wide_cameras, cfg.max_zoom_multiplier);
        self.zoom = Some(zoom);
        if cfg.enable_wide_cameras {
            self.apply_zoom(&device, zoom.initial);
        }
        self.backend.start_running();

        {
            let mut s = shared.lock();
            s.pipeline = PipelineState::Active;
            s.position = Some(device.position);
        }
        log::info!(
            "Pipeline armed with {} ({}, {:?})",
            device.name,
            device.position.as_str(),
            preset
        );
        self.device = Some(device.clone());
        shared.emit(SessionEvent::Armed {
            flash_available: cfg.show_flash_switch && device.has_flash,
            audio: self.audio_attached,
            device,
            preset,
        });
    }

    fn mark_unavailable(&mut self) {
        self.shared.lock().pipeline = PipelineState::Unavailable;
        self.shared.emit(SessionEvent::CameraUnavailable);
    }

    fn attach_audio(&mut self) -> bool {
        if !self.backend.microphone_available() {
            log::info!("Microphone unavailable, recording without audio");
            return false;
        }
        // Replace any audio input left attached by an earlier configuration.
        self.backend.remove_audio_input();
        match self.backend.add_audio_input() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Audio input rejected: {}", e);
                false
            }
        }
    }

    fn apply_preset(&mut self, device: &DeviceInfo, requested: SessionPreset) -> SessionPreset {
        let preset = resolve_preset(device, requested, |p| self.backend.can_set_preset(p));
        if preset != requested {
            log::info!(
                "Preset {:?} unsupported by {}, using {:?}",
                requested,
                device.id,
                preset
            );
        }
        self.backend.set_preset(preset);
        preset
    }

    fn apply_zoom(&mut self, device: &DeviceInfo, factor: f32) {
        match self.backend.set_zoom(device, factor) {
            Ok(()) => self.shared.lock().zoom_factor = factor,
            Err(e) => log::warn!("Zoom to {:.2} dropped: {}", factor, e),
        }
    }

    pub fn set_zoom(&mut self, factor: f32) {
        let (Some(device), Some(zoom)) = (self.device.clone(), self.zoom) else {
            return;
        };
        self.apply_zoom(&device, zoom.clamp(factor));
    }

    pub fn set_focus(&mut self, point: FocusPoint) {
        let Some(device) = self.device.clone() else {
            return;
        };
        if let Err(e) = self.backend.set_focus(&device, point) {
            log::warn!("Focus at ({:.2}, {:.2}) dropped: {}", point.x, point.y, e);
        }
    }

    fn set_torch(&mut self, on: bool) {
        let Some(device) = self.device.clone() else {
            return;
        };
        if !device.has_torch {
            return;
        }
        if let Err(e) = self.backend.set_torch(&device, on) {
            log::warn!("Torch {} dropped: {}", if on { "on" } else { "off" }, e);
        }
    }

    fn output_orientation(&self) -> VideoOrientation {
        let current = self.shared.lock().orientation;
        self.shared
            .config
            .recording
            .locked_output_orientation
            .unwrap_or(current)
    }

    /// A photo taken while idle moves the pipeline to review; one taken
    /// during a recording leaves the pipeline running.
    pub fn capture_photo(&mut self) {
        let photo = self.shoot();
        let review = photo.is_some() && self.shared.lock().recording == RecordingState::Idle;
        if review {
            self.backend.stop_running();
        }
        {
            let mut s = self.shared.lock();
            s.capture = CaptureGate::Open;
            if review {
                s.pipeline = PipelineState::Reviewing;
            }
        }
        match photo {
            Some(bytes) => {
                log::info!("Photo captured ({} bytes)", bytes.len());
                self.shared.emit(SessionEvent::PhotoReady(bytes));
            }
            None => self.shared.emit(SessionEvent::PhotoFailed),
        }
    }

    fn shoot(&mut self) -> Option<Bytes> {
        let shared = Arc::clone(&self.shared);
        let cfg = &shared.config.camera;

        let Some(device) = self.device.clone() else {
            log::warn!("Photo requested without an active camera");
            return None;
        };
        if !self.backend.has_output(OutputKind::Photo) {
            log::warn!("Photo output is no longer attached");
            shared.emit(SessionEvent::CameraUnavailable);
            return None;
        }

        let flash_requested = shared.lock().flash_requested;
        let settings = PhotoSettings {
            flash: flash_requested && cfg.show_flash_switch && device.has_flash,
            mirrored: device.position == CameraPosition::Front && cfg.is_video_mirrored,
            orientation: self.output_orientation(),
        };

        match self.backend.capture_photo(&settings) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => {
                log::warn!("Photo capture produced no data");
                None
            }
            Err(e) => {
                log::warn!("Photo capture failed: {}", e);
                None
            }
        }
    }

    /// Start the next segment of `take`.
    ///
    /// `auto_stop` is only honored for the first segment; resumed segments
    /// keep the timer already running for the take.
    pub fn start_segment(&mut self, take: u64, resumed: bool, auto_stop: Option<Duration>) {
        let state = self.shared.lock().recording;
        if !resumed && state == (RecordingState::PausedForSwitch { take }) {
            log::debug!("Take {} starts after the pending camera switch", take);
            self.pending_start = Some((take, auto_stop));
            return;
        }
        if state != (RecordingState::Recording { take }) {
            log::debug!("Skipping stale start for take {}", take);
            return;
        }

        match self.begin_segment(resumed) {
            Ok(segment_index) => {
                if let Some(after) = auto_stop {
                    self.schedule_auto_stop(take, after);
                }
                log::info!(
                    "Recording take {} segment {}{}",
                    take,
                    segment_index,
                    if resumed { " (resumed)" } else { "" }
                );
                self.shared.emit(SessionEvent::RecordingStarted {
                    take,
                    segment_index,
                    resumed,
                });
            }
            Err(e) => {
                log::warn!("Failed to start recording take {}: {}", take, e);
                let ended = self.shared.lock().request_stop() == Some(take);
                if ended {
                    self.cancel_auto_stop();
                    self.finalize(take);
                }
            }
        }
    }

    fn begin_segment(&mut self, resumed: bool) -> Result<usize, CaptureError> {
        let shared = Arc::clone(&self.shared);
        let cfg = &shared.config;

        let device = self
            .device
            .clone()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no active camera".to_string()))?;
        if !self.backend.has_output(OutputKind::Movie) {
            shared.emit(SessionEvent::CameraUnavailable);
            return Err(CaptureError::ConfigurationRejected(
                "movie output is no longer attached".to_string(),
            ));
        }
        if self.backend.is_recording() {
            return Err(CaptureError::ConfigurationRejected(
                "movie output is already recording".to_string(),
            ));
        }

        let orientation = match (resumed, self.take_orientation) {
            (true, Some(cached)) => cached,
            _ => {
                let o = self.output_orientation();
                self.take_orientation = Some(o);
                o
            }
        };
        let back = device.position == CameraPosition::Back;
        let codec = cfg.recording.video_codec;
        let settings = MovieSettings {
            orientation,
            stabilization: back.then_some(cfg.recording.stabilization_mode),
            codec: self
                .backend
                .available_codecs()
                .contains(&codec)
                .then_some(codec),
            mirrored: !back && cfg.camera.is_video_mirrored,
        };

        let torch = back && shared.lock().flash_requested;
        if torch {
            self.set_torch(true);
        } else if !back {
            self.set_torch(false);
        }

        let path = self.store.allocate_segment();
        if let Err(e) = self.backend.start_recording(&path, &settings) {
            self.store.remove(&path);
            if torch {
                self.set_torch(false);
            }
            return Err(e);
        }
        self.active_segment = Some((path, device.position));
        Ok(self.segments.len())
    }

    fn finish_segment(&mut self) {
        let Some((path, position)) = self.active_segment.take() else {
            return;
        };
        match self.backend.stop_recording() {
            Ok(duration) => self.segments.push(Segment::new(path, duration, position)),
            Err(e) => {
                log::warn!("Segment {:?} could not be finalized: {}", path, e);
                self.store.remove(&path);
            }
        }
    }

    fn schedule_auto_stop(&mut self, take: u64, after: Duration) {
        let queue = self.shared.queue().clone();
        let timer = AutoStopTimer::schedule(after, move || {
            let _ = queue.submit(move |p: &mut Pipeline| p.auto_stop(take));
        });
        match timer {
            Ok(timer) => self.auto_stop = Some(timer),
            Err(e) => log::warn!("Failed to schedule auto-stop: {}", e),
        }
    }

    fn cancel_auto_stop(&mut self) {
        if let Some(timer) = self.auto_stop.take() {
            timer.cancel();
        }
    }

    pub fn auto_stop(&mut self, take: u64) {
        let ended = {
            let mut s = self.shared.lock();
            if s.recording.is_active() && s.recording.take() == Some(take) {
                s.request_stop()
            } else {
                None
            }
        };
        if let Some(take) = ended {
            log::info!("Max duration reached, stopping take {}", take);
            self.stop_recording(take);
        }
    }

    /// End `take`; the caller has already moved the state to finalizing.
    pub fn stop_recording(&mut self, take: u64) {
        if self.shared.lock().recording != (RecordingState::Finalizing { take }) {
            log::debug!("Skipping stale stop for take {}", take);
            return;
        }
        self.cancel_auto_stop();
        self.set_torch(false);
        self.finish_segment();
        self.finalize(take);
    }

    fn finalize(&mut self, take: u64) {
        let segments = self.segments.take();
        let minimum = self.shared.config.recording.min_duration();
        let outcome = finalize_take(segments, minimum, self.composer.as_ref(), &self.store);
        self.take_orientation = None;
        self.pending_start = None;

        if let (Some(device), Some(zoom)) = (self.device.clone(), self.zoom) {
            self.apply_zoom(&device, zoom.initial);
        }

        let accepted = outcome.is_accepted();
        if accepted {
            self.backend.stop_running();
        }
        {
            let mut s = self.shared.lock();
            s.recording = RecordingState::Idle;
            if accepted {
                s.pipeline = PipelineState::Reviewing;
            }
        }

        let event = match outcome {
            TakeOutcome::Accepted {
                path,
                duration,
                segment_count,
            } => {
                log::info!(
                    "Take {} finished: {:?} ({:.3}s, {} segment(s))",
                    take,
                    path,
                    duration.as_secs_f64(),
                    segment_count
                );
                self.last_artifact = Some(path.clone());
                SessionEvent::RecordingFinished {
                    path,
                    duration,
                    segment_count,
                }
            }
            TakeOutcome::TooShort { recorded, minimum } => {
                SessionEvent::RecordingRejectedTooShort { minimum, recorded }
            }
            TakeOutcome::MergeFailed(e) => SessionEvent::MergeFailed {
                message: e.to_string(),
            },
            TakeOutcome::Empty => {
                log::info!("Take {} ended with nothing recorded", take);
                SessionEvent::RecordingAborted
            }
        };
        self.shared.emit(event);
    }

    pub fn switch_camera(&mut self) {
        let shared = Arc::clone(&self.shared);

        let splitting = match shared.lock().recording {
            RecordingState::PausedForSwitch { take } => Some(take),
            _ => None,
        };
        // The outgoing input takes its segment with it, even when a stop
        // already arrived for the take.
        self.finish_segment();

        let switched = self.swap_camera(&shared.config.camera);
        shared.lock().switching = false;
        match switched {
            Some(position) => {
                log::info!("Switched to {} camera", position.as_str());
                shared.emit(SessionEvent::SwitchCameraCompleted { position });
            }
            None => shared.emit(SessionEvent::SwitchCameraFailed),
        }

        if let Some(take) = splitting {
            self.resume_after_switch(take);
        }
    }

    /// Replace the video input with the opposite camera.
    ///
    /// The previous input is restored when the new one is rejected, so the
    /// pipeline always keeps a video input.
    fn swap_camera(&mut self, cfg: &CameraConfig) -> Option<CameraPosition> {
        let current = self.device.clone()?;
        let target = current.position.opposite();

        let cameras = self.backend.discover_cameras();
        let Some(next) = resolve_device(&cameras, target, cfg.enable_wide_cameras) else {
            log::warn!("No {} camera to switch to", target.as_str());
            return None;
        };

        self.backend.begin_configuration();
        self.backend.remove_video_input(&current);
        let accepted = match self.backend.add_video_input(&next) {
            Ok(()) => {
                self.apply_preset(&next, cfg.session_preset);
                true
            }
            Err(e) => {
                log::warn!("Video input rejected for {}: {}", next.id, e);
                if let Err(e) = self.backend.add_video_input(&current) {
                    log::error!("Failed to restore video input {}: {}", current.id, e);
                }
                self.apply_preset(&current, cfg.session_preset);
                false
            }
        };
        self.backend.commit_configuration();

        if !accepted {
            return None;
        }

        let zoom = ZoomLimits::for_device(&next, cfg.enable_wide_cameras, cfg.max_zoom_multiplier);
        self.zoom = Some(zoom);
        {
            let mut s = self.shared.lock();
            s.position = Some(next.position);
            s.zoom_factor = zoom.initial;
        }
        if cfg.enable_wide_cameras {
            self.apply_zoom(&next, zoom.initial);
        }
        let position = next.position;
        self.device = Some(next);
        Some(position)
    }

    fn resume_after_switch(&mut self, take: u64) {
        let shared = Arc::clone(&self.shared);
        let hook = shared.hook();
        let (resumed, auto_stop) = match self.pending_start.take() {
            Some((pending, auto_stop)) if pending == take => (false, auto_stop),
            _ => (true, None),
        };

        let admitted = {
            let mut s = shared.lock();
            if s.recording != (RecordingState::PausedForSwitch { take }) {
                None
            } else if hook.is_some() {
                // A photo may already hold the gate; only claim it when open.
                let owns_gate = s.capture == CaptureGate::Open;
                if owns_gate {
                    s.capture = CaptureGate::AwaitingHook;
                }
                Some(owns_gate)
            } else {
                s.recording = RecordingState::Recording { take };
                Some(false)
            }
        };
        let Some(owns_gate) = admitted else {
            log::debug!("Take {} ended during camera switch", take);
            return;
        };

        match hook {
            Some(hook) => hook(
                CaptureContinuation::new(
                    shared,
                    DeferredAction::ResumeRecording {
                        take,
                        resumed,
                        auto_stop,
                        owns_gate,
                    },
                ),
                true,
            ),
            None => self.start_segment(take, resumed, auto_stop),
        }
    }

    pub fn retake(&mut self) {
        if self.shared.lock().pipeline != PipelineState::Reviewing {
            return;
        }
        if let Some(path) = self.last_artifact.take() {
            self.store.remove(&path);
        }
        self.backend.start_running();
        self.shared.lock().pipeline = PipelineState::Active;
        log::info!("Pipeline restarted for retake");
        self.shared.emit(SessionEvent::PipelineRestarted);
    }

    /// Tear down: abandon any recording and stop the pipeline.
    pub fn shutdown(&mut self) {
        self.cancel_auto_stop();
        self.pending_start = None;
        if let Some((path, _)) = self.active_segment.take() {
            self.set_torch(false);
            if let Err(e) = self.backend.stop_recording() {
                log::debug!("Abandoned recording did not stop cleanly: {}", e);
            }
            self.store.remove(&path);
        }
        discard(&self.segments.take(), &self.store);
        if self.backend.is_running() {
            self.backend.stop_running();
        }

        let mut s = self.shared.lock();
        s.pipeline = PipelineState::Closed;
        s.recording = RecordingState::Idle;
        s.capture = CaptureGate::Open;
        s.switching = false;
        log::info!("Pipeline shut down");
    }
}
