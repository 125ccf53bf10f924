//! Configuration management for CrabCapture
//!
//! Provides loading, saving, and validation of camera, recording, and
//! storage options for a capture session.

use crate::errors::CaptureError;
use crate::platform::{
    CameraPosition, SessionPreset, StabilizationMode, VideoCodec, VideoOrientation,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabCaptureConfig {
    pub camera: CameraConfig,
    pub recording: RecordingConfig,
    pub storage: StorageConfig,
}

/// Camera and pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera position used when the pipeline is armed
    pub device_position: CameraPosition,
    /// Requested capture preset; falls back to `photo` when unsupported
    pub session_preset: SessionPreset,
    /// Prefer triple/dual virtual cameras when available
    pub enable_wide_cameras: bool,
    pub allow_take_photo: bool,
    pub allow_record_video: bool,
    /// Offer the flash toggle when the device has a flash
    pub show_flash_switch: bool,
    /// Mirror front camera output
    pub is_video_mirrored: bool,
    /// Upper zoom bound as a multiple of the device's base zoom
    pub max_zoom_multiplier: f32,
}

/// Recording configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Takes shorter than this are rejected
    pub min_record_duration_secs: f64,
    /// Tap-mode recordings stop automatically after this long
    pub max_record_duration_secs: f64,
    /// Single tap starts and stops recording instead of press-and-hold
    pub tap_to_record_video: bool,
    pub video_codec: VideoCodec,
    /// Applied to back camera recordings only
    pub stabilization_mode: StabilizationMode,
    /// Fixed output orientation; device orientation is used when unset
    pub locked_output_orientation: Option<VideoOrientation>,
}

/// Temporary file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for segment and take files; system temp dir when unset
    pub temp_directory: Option<String>,
    pub segment_extension: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_position: CameraPosition::Back,
            session_preset: SessionPreset::Hd1920x1080,
            enable_wide_cameras: false,
            allow_take_photo: true,
            allow_record_video: true,
            show_flash_switch: true,
            is_video_mirrored: true,
            max_zoom_multiplier: 15.0,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            min_record_duration_secs: 0.0,
            max_record_duration_secs: 20.0,
            tap_to_record_video: false,
            video_codec: VideoCodec::H264,
            stabilization_mode: StabilizationMode::Auto,
            locked_output_orientation: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_directory: None,
            segment_extension: "mp4".to_string(),
        }
    }
}

impl RecordingConfig {
    pub fn min_duration(&self) -> Duration {
        Duration::from_secs_f64(self.min_record_duration_secs.max(0.0))
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_record_duration_secs.max(0.0))
    }
}

impl StorageConfig {
    /// Resolved directory for segment files
    pub fn temp_dir(&self) -> PathBuf {
        match &self.temp_directory {
            Some(dir) => PathBuf::from(dir),
            None => std::env::temp_dir().join("crabcapture"),
        }
    }
}

impl CrabCaptureConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            CaptureError::InvalidConfig(format!("Failed to read config file: {}", e))
        })?;

        let config: CrabCaptureConfig = toml::from_str(&contents).map_err(|e| {
            CaptureError::InvalidConfig(format!("Failed to parse config file: {}", e))
        })?;

        config.validate().map_err(CaptureError::InvalidConfig)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self).map_err(|e| {
            CaptureError::InvalidConfig(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabcapture.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if !self.camera.allow_take_photo && !self.camera.allow_record_video {
            return Err("At least one of photo capture or video recording must be allowed".to_string());
        }
        if !(self.camera.max_zoom_multiplier >= 1.0) {
            return Err("Max zoom multiplier must be at least 1.0".to_string());
        }

        let rec = &self.recording;
        if !(rec.max_record_duration_secs > 0.0) {
            return Err("Max record duration must be positive".to_string());
        }
        if !(rec.min_record_duration_secs >= 0.0) {
            return Err("Min record duration must not be negative".to_string());
        }
        if rec.min_record_duration_secs > rec.max_record_duration_secs {
            return Err("Min record duration exceeds max record duration".to_string());
        }

        if self.storage.segment_extension.trim().is_empty() {
            return Err("Segment extension must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CrabCaptureConfig::default();
        assert_eq!(config.camera.device_position, CameraPosition::Back);
        assert_eq!(config.recording.max_duration(), Duration::from_secs(20));
        assert_eq!(config.recording.min_duration(), Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad = CrabCaptureConfig::default();
        bad.recording.min_record_duration_secs = 30.0;
        assert!(bad.validate().is_err());

        let mut bad = CrabCaptureConfig::default();
        bad.camera.allow_take_photo = false;
        bad.camera.allow_record_video = false;
        assert!(bad.validate().is_err());

        let mut bad = CrabCaptureConfig::default();
        bad.camera.max_zoom_multiplier = f32::NAN;
        assert!(bad.validate().is_err());

        let mut bad = CrabCaptureConfig::default();
        bad.storage.segment_extension = " ".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabcapture.toml");

        let mut config = CrabCaptureConfig::default();
        config.recording.min_record_duration_secs = 1.5;
        config.recording.locked_output_orientation = Some(VideoOrientation::LandscapeLeft);
        config.save_to_file(&config_path).unwrap();

        let loaded = CrabCaptureConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.recording.min_record_duration_secs, 1.5);
        assert_eq!(
            loaded.recording.locked_output_orientation,
            Some(VideoOrientation::LandscapeLeft)
        );
    }

    #[test]
    fn test_config_toml_format() {
        let config = CrabCaptureConfig::default();
        let toml_string = toml::to_string_pretty(&config).unwrap();

        assert!(toml_string.contains("[camera]"));
        assert!(toml_string.contains("[recording]"));
        assert!(toml_string.contains("[storage]"));
        assert!(toml_string.contains("session_preset = \"hd1920x1080\""));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        fs::write(&path, "[recording]\nmin_record_duration_secs = 1.0\n").unwrap();

        let loaded = CrabCaptureConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.recording.min_duration(), Duration::from_secs(1));
        assert_eq!(loaded.recording.max_record_duration_secs, 20.0);
        assert!(loaded.camera.allow_record_video);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[recording]\nmax_record_duration_secs = -1.0\n").unwrap();
        assert!(matches!(
            CrabCaptureConfig::load_from_file(&path),
            Err(CaptureError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = CrabCaptureConfig::load_from_file("nonexistent_crabcapture.toml");
        assert!(result.is_ok());
    }
}
