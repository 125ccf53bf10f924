//! Value types describing the capture hardware and per-capture settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraPosition {
    Front,
    Back,
}

impl CameraPosition {
    /// The position a camera switch moves to.
    pub fn opposite(self) -> Self {
        match self {
            CameraPosition::Front => CameraPosition::Back,
            CameraPosition::Back => CameraPosition::Front,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CameraPosition::Front => "front",
            CameraPosition::Back => "back",
        }
    }
}

/// Physical construction of a camera device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    WideAngle,
    UltraWide,
    Telephoto,
    /// Wide + telephoto virtual device
    Dual,
    /// Ultra wide + wide virtual device
    DualWide,
    /// Ultra wide + wide + telephoto virtual device
    Triple,
}

impl DeviceKind {
    pub fn is_multi_camera(&self) -> bool {
        matches!(self, DeviceKind::Dual | DeviceKind::DualWide | DeviceKind::Triple)
    }
}

/// Capture quality preset requested from the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPreset {
    Cif352x288,
    Vga640x480,
    Hd1280x720,
    Hd1920x1080,
    Hd4k3840x2160,
    /// Full sensor still capture; accepted by every device.
    Photo,
}

impl Default for SessionPreset {
    fn default() -> Self {
        SessionPreset::Hd1920x1080
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoCodec {
    H264,
    Hevc,
}

impl Default for VideoCodec {
    fn default() -> Self {
        VideoCodec::H264
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Default for VideoOrientation {
    fn default() -> Self {
        VideoOrientation::Portrait
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilizationMode {
    Off,
    Standard,
    Cinematic,
    Auto,
}

impl Default for StabilizationMode {
    fn default() -> Self {
        StabilizationMode::Auto
    }
}

/// A camera as reported by device discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub position: CameraPosition,
    pub kind: DeviceKind,
    pub has_flash: bool,
    pub has_torch: bool,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom factor that frames like a single wide-angle lens on multi-camera devices.
    pub default_zoom: f32,
    pub supported_presets: Vec<SessionPreset>,
}

impl DeviceInfo {
    pub fn supports_preset(&self, preset: SessionPreset) -> bool {
        preset == SessionPreset::Photo || self.supported_presets.contains(&preset)
    }
}

/// Normalized point of interest; (0, 0) is top-left and (1, 1) bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f32,
    pub y: f32,
}

impl FocusPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: clamp_unit(x),
            y: clamp_unit(y),
        }
    }

    pub fn center() -> Self {
        Self { x: 0.5, y: 0.5 }
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// Output kinds attached to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Photo,
    Movie,
}

/// Settings for one still capture.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoSettings {
    pub flash: bool,
    pub mirrored: bool,
    pub orientation: VideoOrientation,
}

/// Settings applied to the movie output before a segment starts.
#[derive(Debug, Clone, PartialEq)]
pub struct MovieSettings {
    pub orientation: VideoOrientation,
    pub stabilization: Option<StabilizationMode>,
    /// `None` keeps the platform default codec.
    pub codec: Option<VideoCodec>,
    pub mirrored: bool,
}
