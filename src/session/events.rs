use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;

use crate::config::RecordingConfig;
use crate::errors::CaptureError;
use crate::platform::{CameraPosition, DeviceInfo, SessionPreset};

/// How a recording was started by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTrigger {
    /// Tap to start, tap again to stop; stops on its own after the max duration.
    Tap,
    /// Press and hold; the caller stops on release.
    Hold,
}

impl RecordTrigger {
    /// Trigger matching the configured record button behavior.
    pub fn from_config(cfg: &RecordingConfig) -> Self {
        if cfg.tap_to_record_video {
            RecordTrigger::Tap
        } else {
            RecordTrigger::Hold
        }
    }
}

/// Notifications delivered from the session to the UI layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Pipeline is running with `device`.
    Armed {
        device: DeviceInfo,
        preset: SessionPreset,
        flash_available: bool,
        audio: bool,
    },
    /// No usable camera; photo and record affordances should be disabled.
    CameraUnavailable,
    PhotoReady(Bytes),
    PhotoFailed,
    RecordingStarted {
        take: u64,
        segment_index: usize,
        /// True when this segment continues a take after a camera switch.
        resumed: bool,
    },
    /// The take's final artifact; intermediate segments are gone.
    RecordingFinished {
        path: PathBuf,
        duration: Duration,
        segment_count: usize,
    },
    RecordingRejectedTooShort {
        minimum: Duration,
        recorded: Duration,
    },
    /// The take was discarded because its segments could not be joined.
    MergeFailed { message: String },
    /// The take ended without any recorded segment.
    RecordingAborted,
    SwitchCameraCompleted { position: CameraPosition },
    SwitchCameraFailed,
    /// Review finished; the pipeline is live again.
    PipelineRestarted,
}

impl SessionEvent {
    /// The error a caller should surface for a failure notification.
    pub fn as_error(&self) -> Option<CaptureError> {
        match self {
            SessionEvent::CameraUnavailable => Some(CaptureError::DeviceUnavailable(
                "no usable camera".to_string(),
            )),
            SessionEvent::RecordingRejectedTooShort { minimum, recorded } => {
                Some(CaptureError::RecordingTooShort {
                    recorded: *recorded,
                    minimum: *minimum,
                })
            }
            SessionEvent::MergeFailed { message } => Some(CaptureError::MergeFailed(message.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_follows_tap_setting() {
        let mut cfg = RecordingConfig::default();
        cfg.tap_to_record_video = true;
        assert_eq!(RecordTrigger::from_config(&cfg), RecordTrigger::Tap);
        cfg.tap_to_record_video = false;
        assert_eq!(RecordTrigger::from_config(&cfg), RecordTrigger::Hold);
    }

    #[test]
    fn test_failure_events_map_to_errors() {
        let short = SessionEvent::RecordingRejectedTooShort {
            minimum: Duration::from_secs(1),
            recorded: Duration::from_millis(200),
        };
        match short.as_error() {
            Some(CaptureError::RecordingTooShort { recorded, minimum }) => {
                assert_eq!(recorded, Duration::from_millis(200));
                assert_eq!(minimum, Duration::from_secs(1));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            SessionEvent::MergeFailed {
                message: "x".to_string()
            }
            .as_error(),
            Some(CaptureError::MergeFailed(_))
        ));
        assert!(SessionEvent::PhotoFailed.as_error().is_none());
        assert!(SessionEvent::RecordingAborted.as_error().is_none());
    }
}
