//! Pre-capture hook support.
//!
//! When a hook is installed, photo capture and recording start are handed to
//! it as a [`CaptureContinuation`] instead of running immediately. The hook
//! may show a countdown and then call [`CaptureContinuation::proceed`].
//! Dropping the continuation without proceeding cancels the request and
//! releases the capture gate.

use std::sync::Arc;
use std::time::Duration;

use super::events::RecordTrigger;
use super::shared::Shared;

/// Called with the deferred request and whether a capture or recording is
/// already underway (so effects like a countdown can be skipped).
pub type PreCaptureHook = Arc<dyn Fn(CaptureContinuation, bool) + Send + Sync + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredAction {
    Photo,
    StartRecording(RecordTrigger),
    /// Next segment of `take` after a camera switch.
    ResumeRecording {
        take: u64,
        /// False when the switch overtook the take's first segment.
        resumed: bool,
        auto_stop: Option<Duration>,
        /// Whether this continuation closed the capture gate.
        owns_gate: bool,
    },
}

/// Deferred capture request handed to a [`PreCaptureHook`].
pub struct CaptureContinuation {
    pending: Option<(Arc<Shared>, DeferredAction)>,
}

impl CaptureContinuation {
    pub(crate) fn new(shared: Arc<Shared>, action: DeferredAction) -> Self {
        Self {
            pending: Some((shared, action)),
        }
    }

    /// True for photo requests, false for recording.
    pub fn is_photo(&self) -> bool {
        matches!(self.pending, Some((_, DeferredAction::Photo)))
    }

    /// Run the deferred request.
    pub fn proceed(mut self) {
        if let Some((shared, action)) = self.pending.take() {
            shared.proceed(action);
        }
    }
}

impl Drop for CaptureContinuation {
    fn drop(&mut self) {
        if let Some((shared, action)) = self.pending.take() {
            log::debug!("Pre-capture continuation dropped: {:?}", action);
            shared.abandon(action);
        }
    }
}

impl std::fmt::Debug for CaptureContinuation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureContinuation")
            .field("action", &self.pending.as_ref().map(|(_, a)| *a))
            .finish()
    }
}
