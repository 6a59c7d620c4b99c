//! The seam between [`Detector`](crate::Detector) and the code that actually
//! finds tags.

use image::GrayImage;

use crate::detection::Detection;
use crate::error::Result;
use crate::options::DetectorOptions;

/// Output of one backend detection call.
#[derive(Debug, Clone, Default)]
pub struct DetectOutput {
    pub detections: Vec<Detection>,
    /// Rendering of the detections, same size as the input image.
    pub visualization: Option<GrayImage>,
}

/// A tag detector implementation.
///
/// Backends are driven by one thread at a time; they must be movable between
/// threads but need not be shareable.
pub trait DetectorBackend: Send {
    /// Names of every tag family this backend can load.
    fn available_families(&self) -> Result<Vec<String>>;

    /// Apply the tuning parameters in `options` (family selection excluded).
    fn configure(&mut self, options: &DetectorOptions) -> Result<()>;

    /// Load one tag family with the given black border width.
    fn add_family(&mut self, name: &str, border: i32) -> Result<()>;

    /// Detect tags in `image`. When `visualize` is set the output also carries
    /// a rendering of the detections.
    fn detect(&mut self, image: &GrayImage, visualize: bool) -> Result<DetectOutput>;
}
