//! Turning the segments of a finished take into one artifact

use std::path::PathBuf;
use std::time::Duration;

use super::segment::Segment;
use super::store::SegmentStore;
use crate::errors::CaptureError;
use crate::platform::MediaComposer;

/// Result of closing out a take.
#[derive(Debug)]
pub enum TakeOutcome {
    /// The take is retained at `path`; no intermediate files remain.
    Accepted {
        path: PathBuf,
        duration: Duration,
        segment_count: usize,
    },
    /// Aggregate duration was below the minimum; every segment was deleted.
    TooShort { recorded: Duration, minimum: Duration },
    /// Concatenation failed; every segment and any partial output was deleted.
    MergeFailed(CaptureError),
    /// Nothing was recorded.
    Empty,
}

impl TakeOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TakeOutcome::Accepted { .. })
    }
}

/// Check the aggregate duration and merge multi-segment takes.
///
/// A single segment becomes the artifact as-is. Several segments are
/// concatenated in recording order into a fresh file from `store`.
pub fn finalize_take(
    segments: Vec<Segment>,
    minimum: Duration,
    composer: &dyn MediaComposer,
    store: &SegmentStore,
) -> TakeOutcome {
    if segments.is_empty() {
        return TakeOutcome::Empty;
    }

    let recorded: Duration = segments.iter().map(|s| s.duration).sum();
    if recorded < minimum {
        log::info!(
            "Take rejected: {:.3}s recorded, minimum {:.3}s",
            recorded.as_secs_f64(),
            minimum.as_secs_f64()
        );
        discard(&segments, store);
        return TakeOutcome::TooShort { recorded, minimum };
    }

    if let [segment] = segments.as_slice() {
        let segment = segment.clone();
        return TakeOutcome::Accepted {
            path: segment.path,
            duration: segment.duration,
            segment_count: 1,
        };
    }

    let output = store.allocate_take();
    let result = composer.concatenate(&segments, &output);
    discard(&segments, store);

    match result {
        Ok(duration) => {
            log::info!(
                "Merged {} segments into {:?} ({:.3}s)",
                segments.len(),
                output,
                duration.as_secs_f64()
            );
            TakeOutcome::Accepted {
                path: output,
                duration,
                segment_count: segments.len(),
            }
        }
        Err(e) => {
            log::warn!("Failed to merge {} segments: {}", segments.len(), e);
            store.remove(&output);
            let e = match e {
                CaptureError::MergeFailed(_) => e,
                other => CaptureError::MergeFailed(other.to_string()),
            };
            TakeOutcome::MergeFailed(e)
        }
    }
}

/// Delete every segment file.
pub fn discard(segments: &[Segment], store: &SegmentStore) {
    for segment in segments {
        store.remove(&segment.path);
    }
}
