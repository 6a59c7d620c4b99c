//! aprilbind: typed Rust binding to the native AprilTag detector library.
//!
//! The detection algorithm lives in `libapriltag`, loaded at runtime. This
//! crate owns everything around the call:
//!
//! 1. **Options** – detector tuning and tag-family selection, loadable from JSON.
//! 2. **Library** – locating and loading the shared object, resolving symbols.
//! 3. **Marshalling** – copying images into native buffers and native
//!    detections back into owned [`Detection`] records.
//! 4. **Detector** – the [`Detector`] facade over a [`DetectorBackend`].
//!
//! # Public API
//! - [`Detector`] and [`DetectorOptions`] as primary entry points
//! - [`Detection`] result records
//! - [`DetectorBackend`] for plugging in a different detector implementation

mod backend;
mod detection;
mod detector;
mod error;
pub mod ffi;
pub mod library;
mod native;
mod options;
pub mod raster;

#[cfg(test)]
pub(crate) mod test_utils;

pub use backend::{DetectOutput, DetectorBackend};
pub use detection::Detection;
pub use detector::Detector;
pub use error::{Error, Result};
pub use library::NativeApi;
pub use native::NativeBackend;
pub use options::{DetectorOptions, FamilySelection};
