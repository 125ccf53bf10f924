use std::time::Duration;

use thiserror::Error;

/// Failures surfaced by the capture pipeline and the session controller.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No camera or microphone matched the request.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),
    /// An input, output, or preset could not be attached to the pipeline.
    #[error("Configuration rejected: {0}")]
    ConfigurationRejected(String),
    /// Zoom, focus, or torch change could not lock the device.
    #[error("Hardware lock failed: {0}")]
    HardwareLockFailed(String),
    #[error(
        "Recording too short: {:.2}s recorded, {:.2}s required",
        recorded.as_secs_f64(),
        minimum.as_secs_f64()
    )]
    RecordingTooShort { recorded: Duration, minimum: Duration },
    #[error("Merge failed: {0}")]
    MergeFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Session is closed")]
    SessionClosed,
    #[error("Timed out waiting for the session queue")]
    Timeout,
}

impl CaptureError {
    /// Whether the UI should show this condition to the user as a notice.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            CaptureError::DeviceUnavailable(_)
                | CaptureError::RecordingTooShort { .. }
                | CaptureError::MergeFailed(_)
        )
    }
}
