//! Property-Based Tests for take finalization and device selection
//!
//! These tests verify invariants of the recording and platform modules
//! using proptest for input generation and shrinking.
//!
//! Run with: cargo test --test take_props

use proptest::prelude::*;
use tempfile::tempdir;

use std::fs;
use std::time::Duration;

use crabcapture::platform::selection::MULTI_CAMERA_PREFERENCE;
use crabcapture::platform::{
    resolve_device, resolve_preset, CameraPosition, DeviceInfo, DeviceKind, SessionPreset,
    ZoomLimits,
};
use crabcapture::recording::{finalize_take, Segment, SegmentStore, TakeOutcome};
use crabcapture::testing::ConcatComposer;

fn position_strategy() -> impl Strategy<Value = CameraPosition> {
    prop_oneof![Just(CameraPosition::Front), Just(CameraPosition::Back)]
}

fn kind_strategy() -> impl Strategy<Value = DeviceKind> {
    prop_oneof![
        Just(DeviceKind::WideAngle),
        Just(DeviceKind::UltraWide),
        Just(DeviceKind::Telephoto),
        Just(DeviceKind::Dual),
        Just(DeviceKind::DualWide),
        Just(DeviceKind::Triple),
    ]
}

fn device_strategy() -> impl Strategy<Value = DeviceInfo> {
    (
        position_strategy(),
        kind_strategy(),
        0.5f32..2.0,
        1.0f32..200.0,
        1.0f32..8.0,
        any::<u32>(),
    )
        .prop_map(|(position, kind, min_zoom, max_zoom, default_zoom, id)| DeviceInfo {
            id: format!("dev-{id}"),
            name: format!("{kind:?}"),
            position,
            kind,
            has_flash: true,
            has_torch: true,
            min_zoom,
            max_zoom,
            default_zoom,
            supported_presets: vec![SessionPreset::Hd1280x720],
        })
}

// ═══════════════════════════════════════════════════════════════════════════
// TAKE FINALIZATION INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// INVARIANT: No intermediate segment file survives finalization,
    /// and at most one artifact remains
    #[test]
    fn finalization_leaves_at_most_one_file(
        durations in prop::collection::vec(0u64..5_000, 0..6),
        minimum_ms in 0u64..10_000,
    ) {
        let dir = tempdir().unwrap();
        let store = SegmentStore::new(dir.path(), "mp4").unwrap();
        let segments: Vec<Segment> = durations
            .iter()
            .enumerate()
            .map(|(i, ms)| {
                let path = store.allocate_segment();
                fs::write(&path, format!("{i}:{ms}\n")).unwrap();
                Segment::new(path, Duration::from_millis(*ms), CameraPosition::Back)
            })
            .collect();
        let recorded: Duration = segments.iter().map(|s| s.duration).sum();
        let minimum = Duration::from_millis(minimum_ms);

        let outcome = finalize_take(segments, minimum, &ConcatComposer, &store);
        let remaining: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();

        match outcome {
            TakeOutcome::Empty => {
                prop_assert!(durations.is_empty());
                prop_assert!(remaining.is_empty());
            }
            TakeOutcome::TooShort { recorded: r, minimum: m } => {
                prop_assert!(r < m);
                prop_assert_eq!(r, recorded);
                prop_assert!(remaining.is_empty(), "rejected take left {:?}", remaining);
            }
            TakeOutcome::Accepted { path, duration, segment_count } => {
                prop_assert!(recorded >= minimum);
                prop_assert_eq!(duration, recorded);
                prop_assert_eq!(segment_count, durations.len());
                prop_assert_eq!(remaining, vec![path]);
            }
            TakeOutcome::MergeFailed(e) => {
                prop_assert!(false, "concatenation should not fail: {}", e);
            }
        }
    }

    /// INVARIANT: Merged output preserves segment order
    #[test]
    fn merge_preserves_recording_order(count in 2usize..6) {
        let dir = tempdir().unwrap();
        let store = SegmentStore::new(dir.path(), "mov").unwrap();
        let segments: Vec<Segment> = (0..count)
            .map(|i| {
                let path = store.allocate_segment();
                fs::write(&path, format!("{i}\n")).unwrap();
                let position = if i % 2 == 0 { CameraPosition::Back } else { CameraPosition::Front };
                Segment::new(path, Duration::from_secs(1), position)
            })
            .collect();

        match finalize_take(segments, Duration::ZERO, &ConcatComposer, &store) {
            TakeOutcome::Accepted { path, .. } => {
                let expected: String = (0..count).map(|i| format!("{i}\n")).collect();
                prop_assert_eq!(fs::read_to_string(&path).unwrap(), expected);
                prop_assert_eq!(path.extension().and_then(|e| e.to_str()), Some("mov"));
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// DEVICE SELECTION INVARIANTS
// ═══════════════════════════════════════════════════════════════════════════

proptest! {
    /// INVARIANT: A resolved device is always at the requested position
    #[test]
    fn resolved_device_matches_position(
        devices in prop::collection::vec(device_strategy(), 0..8),
        position in position_strategy(),
        prefer_multi in any::<bool>(),
    ) {
        if let Some(device) = resolve_device(&devices, position, prefer_multi) {
            prop_assert_eq!(device.position, position);
            if prefer_multi {
                prop_assert!(
                    device.kind.is_multi_camera() || device.kind == DeviceKind::WideAngle
                );
            } else {
                prop_assert_eq!(device.kind, DeviceKind::WideAngle);
            }
        } else {
            prop_assert!(!devices.iter().any(|d| d.position == position
                && d.kind == DeviceKind::WideAngle));
        }
    }

    /// INVARIANT: The highest-ranked multi-camera kind present always wins
    #[test]
    fn multi_camera_ranking_respected(
        devices in prop::collection::vec(device_strategy(), 1..8),
        position in position_strategy(),
    ) {
        let best = MULTI_CAMERA_PREFERENCE
            .iter()
            .find(|k| devices.iter().any(|d| d.position == position && d.kind == **k));
        if let Some(kind) = best {
            let device = resolve_device(&devices, position, true).unwrap();
            prop_assert_eq!(device.kind, *kind);
        }
    }

    /// INVARIANT: Preset resolution never yields something the device cannot run
    #[test]
    fn resolved_preset_is_supported(
        device in device_strategy(),
        session_accepts in any::<bool>(),
        requested in prop_oneof![
            Just(SessionPreset::Vga640x480),
            Just(SessionPreset::Hd1280x720),
            Just(SessionPreset::Hd1920x1080),
            Just(SessionPreset::Hd4k3840x2160),
        ],
    ) {
        let preset = resolve_preset(&device, requested, |_| session_accepts);
        prop_assert!(device.supports_preset(preset));
        prop_assert!(preset == requested || preset == SessionPreset::Photo);
    }

    /// INVARIANT: Clamped zoom stays within limits and min <= initial <= max
    #[test]
    fn zoom_clamps_within_limits(
        device in device_strategy(),
        wide in any::<bool>(),
        multiplier in 1.0f32..20.0,
        request in -100.0f32..500.0,
    ) {
        let limits = ZoomLimits::for_device(&device, wide, multiplier);
        prop_assert!(limits.min <= limits.initial && limits.initial <= limits.max);
        let z = limits.clamp(request);
        prop_assert!(z >= limits.min && z <= limits.max);
        if !wide {
            prop_assert_eq!(limits.min, 1.0);
            prop_assert!(limits.max <= multiplier.max(1.0));
        }
    }
}
