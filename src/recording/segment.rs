//! Recorded segments and the ordered list that makes up one take

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::CameraPosition;

/// One contiguous recorded file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub path: PathBuf,
    pub duration: Duration,
    /// Camera the segment was recorded from
    pub position: CameraPosition,
}

impl Segment {
    pub fn new(path: impl Into<PathBuf>, duration: Duration, position: CameraPosition) -> Self {
        Self {
            path: path.into(),
            duration,
            position,
        }
    }
}

/// Segments of the take in progress, in recording order.
#[derive(Debug, Default)]
pub struct SegmentList {
    segments: Vec<Segment>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: Segment) {
        log::debug!(
            "Segment {} finished: {:?} ({:.3}s)",
            self.segments.len(),
            segment.path,
            segment.duration.as_secs_f64()
        );
        self.segments.push(segment);
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn total_duration(&self) -> Duration {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn contains_path(&self, path: &Path) -> bool {
        self.segments.iter().any(|s| s.path == path)
    }

    /// Hand the segments over, leaving the list empty.
    pub fn take(&mut self) -> Vec<Segment> {
        std::mem::take(&mut self.segments)
    }
}
