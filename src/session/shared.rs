//! State shared between [`CaptureSession`](super::CaptureSession) handles,
//! the queue worker, and outstanding pre-capture continuations.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crossbeam_channel::Sender;

use super::events::{RecordTrigger, SessionEvent};
use super::hook::{DeferredAction, PreCaptureHook};
use super::pipeline::Pipeline;
use super::queue::SerialQueue;
use super::state::{CaptureGate, ControlState, PipelineState, RecordingState};
use crate::config::CrabCaptureConfig;
use crate::errors::CaptureError;

/// State reachable from both the UI side and the queue worker.
pub(crate) struct Shared {
    state: Mutex<ControlState>,
    events: Sender<SessionEvent>,
    queue: SerialQueue<Pipeline>,
    hook: Mutex<Option<PreCaptureHook>>,
    pub config: CrabCaptureConfig,
}

impl Shared {
    pub fn new(
        config: CrabCaptureConfig,
        events: Sender<SessionEvent>,
        queue: SerialQueue<Pipeline>,
    ) -> Self {
        Self {
            state: Mutex::new(ControlState::new()),
            events,
            queue,
            hook: Mutex::new(None),
            config,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().expect("lock poisoned")
    }

    pub fn emit(&self, event: SessionEvent) {
        log::debug!("Event: {:?}", event);
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    pub fn submit<F>(&self, job: F) -> Result<(), CaptureError>
    where
        F: FnOnce(&mut Pipeline) + Send + 'static,
    {
        self.queue.submit(job)
    }

    pub fn queue(&self) -> &SerialQueue<Pipeline> {
        &self.queue
    }

    pub fn hook(&self) -> Option<PreCaptureHook> {
        self.hook.lock().expect("lock poisoned").clone()
    }

    pub fn set_hook(&self, hook: Option<PreCaptureHook>) {
        *self.hook.lock().expect("lock poisoned") = hook;
    }

    pub fn auto_stop_for(&self, trigger: RecordTrigger) -> Option<Duration> {
        match trigger {
            RecordTrigger::Tap => Some(self.config.recording.max_duration()),
            RecordTrigger::Hold => None,
        }
    }

    /// Release a request previously deferred to the pre-capture hook.
    pub fn proceed(&self, action: DeferredAction) {
        match action {
            DeferredAction::Photo => {
                let admitted = {
                    let mut s = self.lock();
                    let admitted =
                        s.capture == CaptureGate::AwaitingHook && s.pipeline == PipelineState::Active;
                    if admitted {
                        s.capture = CaptureGate::InFlight;
                        if self.submit(|p| p.capture_photo()).is_err() {
                            s.capture = CaptureGate::Open;
                        }
                    } else if s.capture == CaptureGate::AwaitingHook {
                        s.capture = CaptureGate::Open;
                    }
                    admitted
                };
                if !admitted {
                    log::debug!("Deferred photo no longer admitted");
                    self.emit(SessionEvent::PhotoFailed);
                }
            }
            DeferredAction::StartRecording(trigger) => {
                let mut s = self.lock();
                if let Some(take) = s.commit_deferred_recording() {
                    let auto_stop = self.auto_stop_for(trigger);
                    // Queued under the lock so a switch cannot overtake it.
                    if self
                        .submit(move |p| p.start_segment(take, false, auto_stop))
                        .is_err()
                    {
                        s.recording = RecordingState::Idle;
                    }
                }
            }
            DeferredAction::ResumeRecording {
                take,
                resumed,
                auto_stop,
                owns_gate,
            } => {
                let resume = {
                    let mut s = self.lock();
                    if owns_gate && s.capture == CaptureGate::AwaitingHook {
                        s.capture = CaptureGate::Open;
                    }
                    if s.recording == (RecordingState::PausedForSwitch { take }) {
                        s.recording = RecordingState::Recording { take };
                        true
                    } else {
                        false
                    }
                };
                if resume {
                    let _ = self.submit(move |p| p.start_segment(take, resumed, auto_stop));
                }
            }
        }
    }

    /// Drop a deferred request without running it.
    pub fn abandon(&self, action: DeferredAction) {
        let mut s = self.lock();
        let owns_gate = match action {
            DeferredAction::ResumeRecording { owns_gate, .. } => owns_gate,
            DeferredAction::Photo | DeferredAction::StartRecording(_) => true,
        };
        if owns_gate && s.capture == CaptureGate::AwaitingHook {
            s.capture = CaptureGate::Open;
        }
        if let DeferredAction::ResumeRecording { take, .. } = action {
            if s.recording == (RecordingState::PausedForSwitch { take }) {
                s.recording = RecordingState::Finalizing { take };
                drop(s);
                let _ = self.submit(move |p| p.stop_recording(take));
            }
        }
    }
}
