//! Device, preset, and zoom resolution.

use super::types::{CameraPosition, DeviceInfo, DeviceKind, SessionPreset};

/// Multi-camera kinds in the order they are preferred when wide cameras are enabled.
pub const MULTI_CAMERA_PREFERENCE: [DeviceKind; 3] =
    [DeviceKind::Triple, DeviceKind::DualWide, DeviceKind::Dual];

/// Pick the camera to use for `position`.
///
/// Only wide-angle devices are eligible unless `prefer_multi_camera` is set,
/// in which case the first multi-camera kind present (ranked by
/// [`MULTI_CAMERA_PREFERENCE`]) wins and wide-angle is the fallback.
pub fn resolve_device(
    candidates: &[DeviceInfo],
    position: CameraPosition,
    prefer_multi_camera: bool,
) -> Option<DeviceInfo> {
    let at_position = || candidates.iter().filter(move |d| d.position == position);

    if prefer_multi_camera {
        for kind in MULTI_CAMERA_PREFERENCE {
            if let Some(device) = at_position().find(|d| d.kind == kind) {
                return Some(device.clone());
            }
        }
    }

    at_position()
        .find(|d| d.kind == DeviceKind::WideAngle)
        .cloned()
}

/// The requested preset when both device and session accept it, otherwise [`SessionPreset::Photo`].
pub fn resolve_preset<F>(device: &DeviceInfo, requested: SessionPreset, session_accepts: F) -> SessionPreset
where
    F: Fn(SessionPreset) -> bool,
{
    if device.supports_preset(requested) && session_accepts(requested) {
        requested
    } else {
        SessionPreset::Photo
    }
}

/// Zoom range a device allows for user-driven zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    /// Factor applied when the pipeline is armed or a take finishes.
    pub initial: f32,
}

impl ZoomLimits {
    pub fn for_device(device: &DeviceInfo, wide_cameras_enabled: bool, max_multiplier: f32) -> Self {
        let base = if wide_cameras_enabled {
            device.default_zoom.max(1.0)
        } else {
            1.0
        };
        let max = (max_multiplier * base).min(device.max_zoom).max(1.0);
        let min = if wide_cameras_enabled {
            device.min_zoom.min(max)
        } else {
            1.0
        };
        let initial = if wide_cameras_enabled {
            device.default_zoom.clamp(min, max)
        } else {
            1.0
        };
        Self { min, max, initial }
    }

    pub fn clamp(&self, factor: f32) -> f32 {
        if factor.is_nan() {
            return self.initial;
        }
        factor.clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, position: CameraPosition, kind: DeviceKind) -> DeviceInfo {
        DeviceInfo {
            id: id.to_string(),
            name: id.to_string(),
            position,
            kind,
            has_flash: true,
            has_torch: true,
            min_zoom: 1.0,
            max_zoom: 120.0,
            default_zoom: 2.0,
            supported_presets: vec![SessionPreset::Hd1280x720],
        }
    }

    #[test]
    fn test_wide_angle_when_multi_disabled() {
        let devices = vec![
            device("triple", CameraPosition::Back, DeviceKind::Triple),
            device("wide", CameraPosition::Back, DeviceKind::WideAngle),
        ];
        let picked = resolve_device(&devices, CameraPosition::Back, false).unwrap();
        assert_eq!(picked.id, "wide");
    }

    #[test]
    fn test_ranked_multi_camera_preference() {
        let devices = vec![
            device("wide", CameraPosition::Back, DeviceKind::WideAngle),
            device("dual", CameraPosition::Back, DeviceKind::Dual),
            device("dualwide", CameraPosition::Back, DeviceKind::DualWide),
        ];
        let picked = resolve_device(&devices, CameraPosition::Back, true).unwrap();
        assert_eq!(picked.id, "dualwide");
    }

    #[test]
    fn test_multi_camera_falls_back_to_wide() {
        let devices = vec![device("front", CameraPosition::Front, DeviceKind::WideAngle)];
        let picked = resolve_device(&devices, CameraPosition::Front, true).unwrap();
        assert_eq!(picked.id, "front");
    }

    #[test]
    fn test_no_device_at_position() {
        let devices = vec![device("back", CameraPosition::Back, DeviceKind::WideAngle)];
        assert!(resolve_device(&devices, CameraPosition::Front, true).is_none());
    }

    #[test]
    fn test_telephoto_never_selected() {
        let devices = vec![device("tele", CameraPosition::Back, DeviceKind::Telephoto)];
        assert!(resolve_device(&devices, CameraPosition::Back, true).is_none());
    }

    #[test]
    fn test_preset_fallback() {
        let d = device("wide", CameraPosition::Back, DeviceKind::WideAngle);
        assert_eq!(
            resolve_preset(&d, SessionPreset::Hd1280x720, |_| true),
            SessionPreset::Hd1280x720
        );
        assert_eq!(
            resolve_preset(&d, SessionPreset::Hd4k3840x2160, |_| true),
            SessionPreset::Photo
        );
        assert_eq!(
            resolve_preset(&d, SessionPreset::Hd1280x720, |_| false),
            SessionPreset::Photo
        );
    }

    #[test]
    fn test_zoom_limits() {
        let d = device("triple", CameraPosition::Back, DeviceKind::Triple);
        let wide = ZoomLimits::for_device(&d, true, 15.0);
        assert_eq!(wide.max, 30.0);
        assert_eq!(wide.initial, 2.0);
        assert_eq!(wide.clamp(0.5), 1.0);

        let plain = ZoomLimits::for_device(&d, false, 15.0);
        assert_eq!(plain.max, 15.0);
        assert_eq!(plain.initial, 1.0);
        assert_eq!(plain.clamp(100.0), 15.0);
    }
}
