//! Session state machine.
//!
//! All transitions requested from the UI side happen here under the session
//! lock, before work is queued. The queue worker moves the machine forward
//! once hardware calls complete.

use crate::platform::{CameraPosition, VideoOrientation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Unarmed,
    Active,
    /// A photo or take is being reviewed; the pipeline is stopped.
    Reviewing,
    /// Arming found no usable camera.
    Unavailable,
    Closed,
}

/// Recording sub-state. `take` identifies the logical take across segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording { take: u64 },
    /// A camera switch is splitting the take; the next segment starts after it.
    PausedForSwitch { take: u64 },
    Finalizing { take: u64 },
}

impl RecordingState {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RecordingState::Recording { .. } | RecordingState::PausedForSwitch { .. }
        )
    }

    pub fn take(&self) -> Option<u64> {
        match *self {
            RecordingState::Idle => None,
            RecordingState::Recording { take }
            | RecordingState::PausedForSwitch { take }
            | RecordingState::Finalizing { take } => Some(take),
        }
    }
}

/// Gate for photo capture and recording start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureGate {
    Open,
    /// A pre-capture hook holds the continuation.
    AwaitingHook,
    /// A photo is being captured on the queue.
    InFlight,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStatus {
    pub pipeline: PipelineState,
    pub recording: RecordingState,
    pub capture: CaptureGate,
    pub switching: bool,
    pub flash_requested: bool,
    pub zoom_factor: f32,
    pub position: Option<CameraPosition>,
}

#[derive(Debug)]
pub(crate) struct ControlState {
    pub pipeline: PipelineState,
    pub recording: RecordingState,
    pub capture: CaptureGate,
    pub switching: bool,
    pub flash_requested: bool,
    pub orientation: VideoOrientation,
    pub zoom_factor: f32,
    pub position: Option<CameraPosition>,
    next_take: u64,
}

/// What the caller must do after a successful gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// Hand a continuation to the pre-capture hook.
    Defer,
    /// Queue the work now.
    Run,
}

impl ControlState {
    pub fn new() -> Self {
        Self {
            pipeline: PipelineState::Unarmed,
            recording: RecordingState::Idle,
            capture: CaptureGate::Open,
            switching: false,
            flash_requested: false,
            orientation: VideoOrientation::Portrait,
            zoom_factor: 1.0,
            position: None,
            next_take: 1,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            pipeline: self.pipeline,
            recording: self.recording,
            capture: self.capture,
            switching: self.switching,
            flash_requested: self.flash_requested,
            zoom_factor: self.zoom_factor,
            position: self.position,
        }
    }

    fn new_take(&mut self) -> u64 {
        let take = self.next_take;
        self.next_take += 1;
        take
    }

    pub fn begin_photo(&mut self, deferred: bool) -> Option<Admission> {
        if self.pipeline != PipelineState::Active || self.capture != CaptureGate::Open {
            return None;
        }
        if deferred {
            self.capture = CaptureGate::AwaitingHook;
            Some(Admission::Defer)
        } else {
            self.capture = CaptureGate::InFlight;
            Some(Admission::Run)
        }
    }

    /// Returns the new take id when recording may start immediately.
    pub fn begin_recording(&mut self, deferred: bool) -> Option<(Admission, Option<u64>)> {
        if self.pipeline != PipelineState::Active
            || self.capture != CaptureGate::Open
            || self.recording != RecordingState::Idle
        {
            return None;
        }
        if deferred {
            self.capture = CaptureGate::AwaitingHook;
            Some((Admission::Defer, None))
        } else {
            let take = self.new_take();
            self.recording = RecordingState::Recording { take };
            Some((Admission::Run, Some(take)))
        }
    }

    /// A deferred recording start was released by its hook.
    pub fn commit_deferred_recording(&mut self) -> Option<u64> {
        if self.capture == CaptureGate::AwaitingHook {
            self.capture = CaptureGate::Open;
        }
        if self.pipeline != PipelineState::Active || self.recording != RecordingState::Idle {
            return None;
        }
        let take = self.new_take();
        self.recording = RecordingState::Recording { take };
        Some(take)
    }

    /// Returns the take being ended, if any.
    pub fn request_stop(&mut self) -> Option<u64> {
        match self.recording {
            RecordingState::Recording { take } | RecordingState::PausedForSwitch { take } => {
                self.recording = RecordingState::Finalizing { take };
                Some(take)
            }
            RecordingState::Idle | RecordingState::Finalizing { .. } => None,
        }
    }

    /// Returns whether a recording is being split by this switch.
    pub fn begin_switch(&mut self) -> Option<bool> {
        if self.pipeline != PipelineState::Active || self.switching {
            return None;
        }
        match self.recording {
            RecordingState::PausedForSwitch { .. } | RecordingState::Finalizing { .. } => None,
            RecordingState::Recording { take } => {
                self.switching = true;
                self.recording = RecordingState::PausedForSwitch { take };
                Some(true)
            }
            RecordingState::Idle => {
                self.switching = true;
                Some(false)
            }
        }
    }

    /// Flip the flash request unless a camera switch is in progress.
    pub fn toggle_flash(&mut self) -> bool {
        if !self.switching {
            self.flash_requested = !self.flash_requested;
        }
        self.flash_requested
    }
}
