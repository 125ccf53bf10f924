//! Segment bookkeeping for multi-segment takes
//!
//! A take is recorded as one or more segment files (a camera switch ends one
//! segment and starts the next). When the take ends the segments are either
//! rejected, kept as-is, or concatenated through a
//! [`MediaComposer`](crate::platform::MediaComposer).
//!
//! # Example
//! ```rust,ignore
//! use crabcapture::recording::{finalize_take, SegmentStore, TakeOutcome};
//!
//! let store = SegmentStore::new(std::env::temp_dir().join("crabcapture"), "mp4")?;
//! match finalize_take(segments, min_duration, &composer, &store) {
//!     TakeOutcome::Accepted { path, .. } => println!("take at {path:?}"),
//!     other => println!("no take: {other:?}"),
//! }
//! ```

mod segment;
mod store;
mod take;

pub use segment::{Segment, SegmentList};
pub use store::SegmentStore;
pub use take::{discard, finalize_take, TakeOutcome};
