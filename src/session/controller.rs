//! Public session handle.
//!
//! [`CaptureSession`] validates requests against the state machine and
//! queues the resulting work for the pipeline thread.

use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, unbounded, Receiver};

use super::events::{RecordTrigger, SessionEvent};
use super::hook::{CaptureContinuation, DeferredAction, PreCaptureHook};
use super::pipeline::Pipeline;
use super::queue::serial_queue;
use super::shared::Shared;
use super::state::{Admission, CaptureGate, PipelineState, RecordingState, SessionStatus};
use crate::config::CrabCaptureConfig;
use crate::errors::CaptureError;
use crate::platform::{CaptureBackend, FocusPoint, MediaComposer, VideoOrientation};
use crate::recording::SegmentStore;

/// Handle to a capture session.
///
/// Requests return immediately; the work runs in order on the session's
/// serial queue and results arrive as [`SessionEvent`]s on [`events`](Self::events).
/// Request methods return `Ok(false)` when the current state does not admit
/// the request.
pub struct CaptureSession {
    shared: Arc<Shared>,
    events: Receiver<SessionEvent>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl CaptureSession {
    /// Spawn the session queue around `backend`. The pipeline is not armed yet.
    pub fn open<B, C>(config: CrabCaptureConfig, backend: B, composer: C) -> Result<Self, CaptureError>
    where
        B: CaptureBackend,
        C: MediaComposer,
    {
        config.validate().map_err(CaptureError::InvalidConfig)?;
        let store = SegmentStore::new(
            config.storage.temp_dir(),
            config.storage.segment_extension.clone(),
        )?;

        let (events_tx, events) = unbounded();
        let (queue, worker) = serial_queue();
        let shared = Arc::new(Shared::new(config, events_tx, queue));
        let pipeline = Pipeline::new(Box::new(backend), Box::new(composer), store, shared.clone());
        let handle = worker.spawn("crabcapture-session", pipeline)?;

        Ok(Self {
            shared,
            events,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Receiver for session notifications. Clones share one stream.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events.clone()
    }

    pub fn config(&self) -> &CrabCaptureConfig {
        &self.shared.config
    }

    pub fn status(&self) -> SessionStatus {
        self.shared.lock().status()
    }

    /// Install a hook that runs before each photo capture and recording start.
    pub fn set_pre_capture_hook<F>(&self, hook: F)
    where
        F: Fn(CaptureContinuation, bool) + Send + Sync + 'static,
    {
        let hook: PreCaptureHook = Arc::new(hook);
        self.shared.set_hook(Some(hook));
    }

    pub fn clear_pre_capture_hook(&self) {
        self.shared.set_hook(None);
    }

    /// Attach inputs and outputs and start the pipeline.
    pub fn arm(&self) -> Result<(), CaptureError> {
        self.ensure_open()?;
        self.shared.submit(|p| p.arm())
    }

    /// Latest physical device orientation, used for unlocked output orientation.
    pub fn set_device_orientation(&self, orientation: VideoOrientation) {
        self.shared.lock().orientation = orientation;
    }

    pub fn capture_photo(&self) -> Result<bool, CaptureError> {
        self.ensure_open()?;
        if !self.shared.config.camera.allow_take_photo {
            return Ok(false);
        }

        let hook = self.shared.hook();
        let (admission, capturing) = {
            let mut s = self.shared.lock();
            let capturing = s.recording.is_active();
            match s.begin_photo(hook.is_some()) {
                Some(admission) => (admission, capturing),
                None => return Ok(false),
            }
        };

        match (admission, hook) {
            (Admission::Defer, Some(hook)) => {
                hook(
                    CaptureContinuation::new(self.shared.clone(), DeferredAction::Photo),
                    capturing,
                );
                Ok(true)
            }
            _ => {
                if let Err(e) = self.shared.submit(|p| p.capture_photo()) {
                    self.shared.lock().capture = CaptureGate::Open;
                    return Err(e);
                }
                Ok(true)
            }
        }
    }

    pub fn start_recording(&self, trigger: RecordTrigger) -> Result<bool, CaptureError> {
        self.ensure_open()?;
        if !self.shared.config.camera.allow_record_video {
            return Ok(false);
        }

        let hook = self.shared.hook();
        let deferred = {
            let mut s = self.shared.lock();
            let Some((admission, take)) = s.begin_recording(hook.is_some()) else {
                return Ok(false);
            };
            match (admission, take) {
                (Admission::Run, Some(take)) => {
                    let auto_stop = self.shared.auto_stop_for(trigger);
                    // Queued under the lock so a switch cannot overtake it.
                    if let Err(e) = self
                        .shared
                        .submit(move |p| p.start_segment(take, false, auto_stop))
                    {
                        s.recording = RecordingState::Idle;
                        return Err(e);
                    }
                    false
                }
                _ => true,
            }
        };

        if let (true, Some(hook)) = (deferred, hook) {
            hook(
                CaptureContinuation::new(
                    self.shared.clone(),
                    DeferredAction::StartRecording(trigger),
                ),
                false,
            );
        }
        Ok(true)
    }

    pub fn stop_recording(&self) -> Result<bool, CaptureError> {
        self.ensure_open()?;
        let Some(take) = self.shared.lock().request_stop() else {
            return Ok(false);
        };
        self.shared.submit(move |p| p.stop_recording(take))?;
        Ok(true)
    }

    /// Swap to the opposite camera. A recording in progress continues as a
    /// new segment of the same take once the switch completes.
    pub fn switch_camera(&self) -> Result<bool, CaptureError> {
        self.ensure_open()?;
        let Some(splitting) = self.shared.lock().begin_switch() else {
            return Ok(false);
        };
        if splitting {
            log::debug!("Camera switch will split the current recording");
        }
        if let Err(e) = self.shared.submit(|p| p.switch_camera()) {
            self.shared.lock().switching = false;
            return Err(e);
        }
        Ok(true)
    }

    pub fn set_zoom(&self, factor: f32) -> Result<(), CaptureError> {
        self.ensure_open()?;
        self.shared.submit(move |p| p.set_zoom(factor))
    }

    pub fn set_focus(&self, point: FocusPoint) -> Result<(), CaptureError> {
        self.ensure_open()?;
        self.shared.submit(move |p| p.set_focus(point))
    }

    /// Flip the flash request and return the new value. Ignored while switching cameras.
    pub fn toggle_flash(&self) -> Result<bool, CaptureError> {
        self.ensure_open()?;
        Ok(self.shared.lock().toggle_flash())
    }

    /// Discard the reviewed result and restart the pipeline.
    pub fn retake(&self) -> Result<(), CaptureError> {
        self.ensure_open()?;
        self.shared.submit(|p| p.retake())
    }

    /// Block until every request submitted so far has run.
    pub fn sync(&self, timeout: Duration) -> Result<(), CaptureError> {
        self.ensure_open()?;
        let (tx, rx) = bounded(1);
        self.shared.submit(move |_| {
            let _ = tx.send(());
        })?;
        rx.recv_timeout(timeout).map_err(|_| CaptureError::Timeout)
    }

    /// Abandon any recording, stop the pipeline, and join the queue worker.
    pub fn close(&self, join_timeout: Duration) -> Result<(), CaptureError> {
        let already_closed = {
            let mut s = self.shared.lock();
            let closed = s.pipeline == PipelineState::Closed;
            s.pipeline = PipelineState::Closed;
            closed
        };

        if !already_closed {
            let _ = self.shared.submit(|p| p.shutdown());
            self.shared.queue().shutdown();
        }

        let join_handle = self.worker.lock().expect("lock poisoned").take();
        if already_closed && join_handle.is_none() {
            return Err(CaptureError::SessionClosed);
        }
        if let Some(handle) = join_handle {
            let start = Instant::now();
            loop {
                if handle.is_finished() {
                    let _ = handle.join();
                    break;
                }
                if start.elapsed() >= join_timeout {
                    // Keep the handle so a later close can retry the join.
                    *self.worker.lock().expect("lock poisoned") = Some(handle);
                    return Err(CaptureError::Timeout);
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), CaptureError> {
        if self.shared.lock().pipeline == PipelineState::Closed {
            return Err(CaptureError::SessionClosed);
        }
        Ok(())
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        match self.close(Duration::from_millis(500)) {
            Ok(()) | Err(CaptureError::SessionClosed) => {}
            Err(e) => log::warn!("Error closing session in drop: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    use crossbeam_channel::Sender;
    use tempfile::TempDir;

    use crate::platform::CameraPosition;
    use crate::testing::{ConcatComposer, SimulatedBackend};
    use crate::timing::ManualClock;

    const WAIT: Duration = Duration::from_secs(5);

    fn armed(
        configure: impl FnOnce(&mut CrabCaptureConfig),
    ) -> (CaptureSession, Receiver<SessionEvent>, ManualClock, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = CrabCaptureConfig::default();
        config.storage.temp_directory = Some(dir.path().to_string_lossy().into_owned());
        configure(&mut config);

        let clock = ManualClock::new();
        let backend = SimulatedBackend::new(Arc::new(clock.clone()));
        let session = CaptureSession::open(config, backend, ConcatComposer).unwrap();
        let events = session.events();
        session.arm().unwrap();
        session.sync(WAIT).unwrap();
        let _ = events.try_iter().count();
        (session, events, clock, dir)
    }

    /// Park the queue worker until the returned sender is dropped.
    fn hold_queue(session: &CaptureSession) -> Sender<()> {
        let (release, held) = bounded::<()>(0);
        session
            .shared
            .submit(move |_| {
                let _ = held.recv();
            })
            .unwrap();
        release
    }

    fn files(dir: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    fn finished(events: &[SessionEvent]) -> Option<(PathBuf, Duration, usize)> {
        events.iter().find_map(|e| match e {
            SessionEvent::RecordingFinished {
                path,
                duration,
                segment_count,
            } => Some((path.clone(), *duration, *segment_count)),
            _ => None,
        })
    }

    #[test]
    fn test_tap_auto_stop_survives_switch_before_first_segment() {
        let (session, events, _clock, dir) =
            armed(|c| c.recording.max_record_duration_secs = 0.3);

        let release = hold_queue(&session);
        assert!(session.start_recording(RecordTrigger::Tap).unwrap());
        assert!(session.switch_camera().unwrap());
        drop(release);

        let mut seen = Vec::new();
        loop {
            match events.recv_timeout(WAIT) {
                Ok(event) => {
                    let done = matches!(event, SessionEvent::RecordingFinished { .. });
                    seen.push(event);
                    if done {
                        break;
                    }
                }
                Err(_) => panic!("tap take never stopped: {:?}", seen),
            }
        }

        assert!(seen.iter().any(|e| matches!(
            e,
            SessionEvent::SwitchCameraCompleted {
                position: CameraPosition::Front
            }
        )));
        let starts: Vec<_> = seen
            .iter()
            .filter_map(|e| match e {
                SessionEvent::RecordingStarted {
                    segment_index,
                    resumed,
                    ..
                } => Some((*segment_index, *resumed)),
                _ => None,
            })
            .collect();
        assert_eq!(starts, vec![(0, false)]);

        let (path, _, segments) = finished(&seen).unwrap();
        assert_eq!(segments, 1);
        assert_eq!(files(&dir), vec![path.clone()]);
        assert!(fs::read_to_string(&path).unwrap().starts_with("front "));
        session.sync(WAIT).unwrap();
        assert_eq!(session.status().recording, RecordingState::Idle);
    }

    #[test]
    fn test_hold_take_starts_on_new_camera_when_switch_queued_first() {
        let (session, events, clock, dir) = armed(|_| {});

        let release = hold_queue(&session);
        session.start_recording(RecordTrigger::Hold).unwrap();
        session.switch_camera().unwrap();
        drop(release);
        session.sync(WAIT).unwrap();
        clock.advance(Duration::from_millis(1500));
        session.stop_recording().unwrap();
        session.sync(WAIT).unwrap();

        let seen: Vec<_> = events.try_iter().collect();
        assert!(seen.iter().any(|e| matches!(
            e,
            SessionEvent::RecordingStarted {
                segment_index: 0,
                resumed: false,
                ..
            }
        )));
        let (path, duration, segments) = finished(&seen).unwrap();
        assert_eq!(duration, Duration::from_millis(1500));
        assert_eq!(segments, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "front 1500ms\n");
        assert_eq!(files(&dir), vec![path]);
    }

    #[test]
    fn test_stop_queued_behind_switch_ends_take() {
        let (session, events, clock, dir) = armed(|_| {});

        session.start_recording(RecordTrigger::Hold).unwrap();
        session.sync(WAIT).unwrap();
        clock.advance(Duration::from_millis(2000));

        let release = hold_queue(&session);
        assert!(session.switch_camera().unwrap());
        assert!(session.stop_recording().unwrap());
        assert!(matches!(
            session.status().recording,
            RecordingState::Finalizing { .. }
        ));
        drop(release);
        session.sync(WAIT).unwrap();

        let seen: Vec<_> = events.try_iter().collect();
        assert!(!seen.iter().any(|e| matches!(
            e,
            SessionEvent::RecordingStarted {
                segment_index: 1,
                ..
            }
        )));
        let (path, duration, segments) = finished(&seen).unwrap();
        assert_eq!(duration, Duration::from_millis(2000));
        assert_eq!(segments, 1);
        assert_eq!(fs::read_to_string(&path).unwrap(), "back 2000ms\n");
        assert_eq!(files(&dir), vec![path]);

        let status = session.status();
        assert_eq!(status.recording, RecordingState::Idle);
        assert_eq!(status.position, Some(CameraPosition::Front));
    }

    #[test]
    fn test_take_stopped_before_any_segment_leaves_nothing() {
        let (session, events, _clock, dir) = armed(|_| {});

        let release = hold_queue(&session);
        session.start_recording(RecordTrigger::Tap).unwrap();
        session.switch_camera().unwrap();
        session.stop_recording().unwrap();
        drop(release);
        session.sync(WAIT).unwrap();

        let seen: Vec<_> = events.try_iter().collect();
        assert!(seen
            .iter()
            .any(|e| matches!(e, SessionEvent::RecordingAborted)));
        assert!(!seen
            .iter()
            .any(|e| matches!(e, SessionEvent::RecordingStarted { .. })));
        assert!(files(&dir).is_empty());
        assert_eq!(session.status().recording, RecordingState::Idle);
    }
}
