//! High-level detection API.
//!
//! [`Detector`] is the primary entry point. It applies a [`DetectorOptions`]
//! to a backend, loads the selected tag families and forwards images to the
//! backend's detector.

use image::GrayImage;

use crate::backend::DetectorBackend;
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::native::NativeBackend;
use crate::options::DetectorOptions;
use crate::raster;

/// Primary detection interface.
///
/// Create once, detect on many images.
///
/// # Examples
///
/// ```no_run
/// use aprilbind::Detector;
/// use image::GrayImage;
///
/// let mut detector = Detector::new().unwrap();
/// let image = GrayImage::new(640, 480);
/// for det in detector.detect(&image).unwrap() {
///     println!("{} #{} at {:?}", det.tag_family, det.tag_id, det.center);
/// }
/// ```
pub struct Detector {
    options: DetectorOptions,
    families: Vec<String>,
    backend: Box<dyn DetectorBackend>,
}

impl Detector {
    /// Create a detector with default options against the native library.
    pub fn new() -> Result<Self> {
        Self::with_options(DetectorOptions::default())
    }

    /// Create a detector with explicit options against the native library.
    pub fn with_options(options: DetectorOptions) -> Result<Self> {
        options.validate()?;
        Self::with_backend(options, Box::new(NativeBackend::new()?))
    }

    /// Create a detector over any backend.
    pub fn with_backend(options: DetectorOptions, backend: Box<dyn DetectorBackend>) -> Result<Self> {
        options.validate()?;
        let mut detector = Self {
            options,
            families: Vec::new(),
            backend,
        };
        detector.backend.configure(&detector.options)?;

        let available = detector.backend.available_families()?;
        tracing::debug!("Backend knows {} tag families", available.len());

        let selected = detector.options.families.resolve(&available);
        if selected.is_empty() {
            return Err(Error::InvalidOptions(format!(
                "family selection '{}' matched no families",
                detector.options.families
            )));
        }
        for name in selected {
            detector.add_tag_family(&name)?;
        }
        tracing::info!("Detector ready with families: {}", detector.families.join(", "));
        Ok(detector)
    }

    pub fn options(&self) -> &DetectorOptions {
        &self.options
    }

    /// Names of every family the backend can load.
    pub fn families(&self) -> Result<Vec<String>> {
        self.backend.available_families()
    }

    /// Families loaded into this detector, in load order.
    pub fn loaded_families(&self) -> &[String] {
        &self.families
    }

    /// Load one more tag family, using the configured border width.
    pub fn add_tag_family(&mut self, name: &str) -> Result<()> {
        if self.families.iter().any(|f| f == name) {
            tracing::debug!("Tag family {} already loaded", name);
            return Ok(());
        }
        self.backend.add_family(name, self.options.border)?;
        self.families.push(name.to_string());
        Ok(())
    }

    /// Detect tags in a grayscale image.
    pub fn detect(&mut self, image: &GrayImage) -> Result<Vec<Detection>> {
        raster::validate_dimensions(image.width(), image.height())?;
        let out = self.backend.detect(image, false)?;
        Ok(out.detections)
    }

    /// Detect tags and also return the backend's rendering of the detections.
    pub fn detect_with_visualization(
        &mut self,
        image: &GrayImage,
    ) -> Result<(Vec<Detection>, GrayImage)> {
        raster::validate_dimensions(image.width(), image.height())?;
        let out = self.backend.detect(image, true)?;
        let vis = out
            .visualization
            .ok_or(Error::Marshal("backend returned no visualization".into()))?;
        Ok((out.detections, vis))
    }
}
