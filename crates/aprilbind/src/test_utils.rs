//! Shared test utilities: synthetic detections and an in-memory backend.

use std::sync::{Arc, Mutex};

use image::{GrayImage, Luma};

use crate::backend::{DetectOutput, DetectorBackend};
use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::options::DetectorOptions;

/// Axis-aligned square tag of half-size `half` centered at `center`.
pub(crate) fn square_detection(family: &str, id: i32, center: [f64; 2], half: f64) -> Detection {
    let [cx, cy] = center;
    Detection {
        tag_family: family.to_string(),
        tag_id: id,
        hamming: 0,
        goodness: 0.0,
        decision_margin: 50.0,
        homography: [[half, 0.0, cx], [0.0, half, cy], [0.0, 0.0, 1.0]],
        center,
        corners: [
            [cx - half, cy + half],
            [cx + half, cy + half],
            [cx + half, cy - half],
            [cx - half, cy - half],
        ],
    }
}

/// What the fake backend was asked to do.
#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub configured: Option<DetectorOptions>,
    pub added: Vec<(String, i32)>,
    pub detect_calls: Vec<(u32, u32, bool)>,
}

/// Backend returning canned detections and recording every call.
pub(crate) struct FakeBackend {
    pub families: Vec<String>,
    pub detections: Vec<Detection>,
    pub log: Arc<Mutex<FakeLog>>,
}

impl FakeBackend {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            families: vec![
                "tag36h11".to_string(),
                "tag25h9".to_string(),
                "tag16h5".to_string(),
            ],
            detections,
            log: Arc::new(Mutex::new(FakeLog::default())),
        }
    }
}

impl DetectorBackend for FakeBackend {
    fn available_families(&self) -> Result<Vec<String>> {
        Ok(self.families.clone())
    }

    fn configure(&mut self, options: &DetectorOptions) -> Result<()> {
        self.log.lock().unwrap().configured = Some(options.clone());
        Ok(())
    }

    fn add_family(&mut self, name: &str, border: i32) -> Result<()> {
        if !self.families.iter().any(|f| f == name) {
            return Err(Error::UnknownFamily(name.to_string()));
        }
        self.log.lock().unwrap().added.push((name.to_string(), border));
        Ok(())
    }

    fn detect(&mut self, image: &GrayImage, visualize: bool) -> Result<DetectOutput> {
        let (w, h) = image.dimensions();
        self.log.lock().unwrap().detect_calls.push((w, h, visualize));
        let visualization = visualize.then(|| GrayImage::from_pixel(w, h, Luma([255])));
        Ok(DetectOutput {
            detections: self.detections.clone(),
            visualization,
        })
    }
}
