//! Testing utilities for CrabCapture
//!
//! Provides a simulated capture backend and a file-concatenating composer
//! for running sessions without camera hardware.

pub mod simulated;

pub use simulated::{
    standard_cameras, BackendCall, BackendProbe, ConcatComposer, SimulatedBackend,
};
