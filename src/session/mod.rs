//! Capture and recording session controller
//!
//! [`CaptureSession`] mediates all camera and microphone access through one
//! serial queue. UI-facing requests check and advance the session state
//! machine under a lock, then enqueue the hardware work; the queue worker
//! owns the [`CaptureBackend`](crate::platform::CaptureBackend) and reports
//! results as [`SessionEvent`]s.
//!
//! Recording states: `Idle → Recording → (PausedForSwitch → Recording)* →
//! Finalizing → Idle`. A camera switch during recording closes the current
//! segment and starts a new one on the new camera; stopping merges the
//! segments of the take.

mod controller;
mod events;
mod hook;
mod pipeline;
mod queue;
mod shared;
mod state;
mod timer;

pub use controller::CaptureSession;
pub use events::{RecordTrigger, SessionEvent};
pub use hook::{CaptureContinuation, PreCaptureHook};
pub use state::{CaptureGate, PipelineState, RecordingState, SessionStatus};
