//! CrabCapture: serialized camera capture and multi-segment recording
//!
//! This crate drives a camera capture pipeline through a single serial queue
//! and an explicit state machine. It takes photos, records video takes that
//! may span several cameras, and merges the segments of a take into one
//! artifact when recording stops.
//!
//! # Features
//! - Photo capture with flash, mirroring, and orientation handling
//! - Recording that survives camera switches as one logical take
//! - Minimum duration rejection and automatic stop for tap-to-record
//! - Pre-capture hook that can delay or cancel a capture
//! - Hardware access behind the [`CaptureBackend`] and [`MediaComposer`] traits
//!
//! # Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use crabcapture::testing::{ConcatComposer, SimulatedBackend};
//! use crabcapture::timing::MonotonicClock;
//! use crabcapture::{CaptureSession, CrabCaptureConfig, RecordTrigger};
//!
//! let backend = SimulatedBackend::new(Arc::new(MonotonicClock::new()));
//! let session = CaptureSession::open(CrabCaptureConfig::default(), backend, ConcatComposer)?;
//! session.arm()?;
//! session.start_recording(RecordTrigger::Hold)?;
//! session.switch_camera()?;
//! session.stop_recording()?;
//! for event in session.events().try_iter() {
//!     println!("{:?}", event);
//! }
//! session.close(Duration::from_secs(1))?;
//! # Ok::<(), crabcapture::CaptureError>(())
//! ```
pub mod config;
pub mod errors;
pub mod platform;
pub mod recording;
pub mod session;
pub mod timing;

// Testing utilities - simulated hardware for offline testing
pub mod testing;

// Re-exports for convenience
pub use config::CrabCaptureConfig;
pub use errors::CaptureError;
pub use platform::{CameraPosition, CaptureBackend, DeviceInfo, MediaComposer};
pub use session::{
    CaptureContinuation, CaptureSession, PipelineState, RecordTrigger, RecordingState,
    SessionEvent, SessionStatus,
};

/// Initialize logging for the capture system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabcapture=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabcapture");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_crate_info_serializes() {
        let json = serde_json::to_string(&get_info()).unwrap();
        assert!(json.contains("\"name\":\"crabcapture\""));
    }

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        assert!(std::env::var("RUST_LOG").is_ok());
    }
}
