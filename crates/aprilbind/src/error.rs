//! Error type shared by every layer of the binding.

use std::path::PathBuf;

/// Errors raised while loading the native library, configuring a detector
/// or running a detection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No candidate path produced a loadable native library.
    #[error("native AprilTag library not found (tried: {})", format_candidates(.tried))]
    LibraryNotFound { tried: Vec<PathBuf> },

    /// The library loaded but lacks a required entry point.
    #[error("native library is missing symbol `{symbol}`")]
    MissingSymbol {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// A native constructor returned a null pointer.
    #[error("native call `{0}` returned null")]
    NullPointer(&'static str),

    /// The native library does not know the requested tag family.
    #[error("unrecognized tag family '{0}' (try e.g. tag36h11)")]
    UnknownFamily(String),

    #[error("invalid image {width}x{height}: {reason}")]
    InvalidImage {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    #[error("invalid detector options: {0}")]
    InvalidOptions(String),

    /// Native data did not have the expected shape.
    #[error("malformed native data: {0}")]
    Marshal(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_candidates(tried: &[PathBuf]) -> String {
    if tried.is_empty() {
        return "<none>".to_string();
    }
    tried
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
