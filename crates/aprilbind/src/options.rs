//! Detector configuration.
//!
//! [`DetectorOptions`] carries every knob the native detector exposes. Option
//! files are JSON overlays: missing fields keep their defaults.

use std::path::Path;

use crate::error::{Error, Result};

/// Which tag families a detector should load.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "FamilySpec", into = "FamilySpec")]
pub enum FamilySelection {
    /// Every family the native library knows.
    All,
    /// An explicit list of family names, in load order.
    Names(Vec<String>),
}

impl FamilySelection {
    /// Parse a family string: exactly `"all"`, or names separated by any run
    /// of characters other than ASCII letters, digits and `_`
    /// (`"tag36h11, tag25h9"`, `"tag36h11 tag16h5"`).
    pub fn parse(text: &str) -> Self {
        if text == "all" {
            return Self::All;
        }
        Self::Names(
            text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Resolve the selection against the families the backend knows.
    pub fn resolve(&self, available: &[String]) -> Vec<String> {
        match self {
            Self::All => available.to_vec(),
            Self::Names(names) => names.clone(),
        }
    }
}

impl Default for FamilySelection {
    fn default() -> Self {
        Self::Names(vec!["tag36h11".to_string()])
    }
}

impl std::str::FromStr for FamilySelection {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl std::fmt::Display for FamilySelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Names(names) => f.write_str(&names.join(" ")),
        }
    }
}

/// Serialized form: either a family string or a list of names.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum FamilySpec {
    Text(String),
    List(Vec<String>),
}

impl From<FamilySpec> for FamilySelection {
    fn from(spec: FamilySpec) -> Self {
        match spec {
            FamilySpec::Text(text) => Self::parse(&text),
            FamilySpec::List(names) => Self::Names(names),
        }
    }
}

impl From<FamilySelection> for FamilySpec {
    fn from(sel: FamilySelection) -> Self {
        match sel {
            FamilySelection::All => FamilySpec::Text("all".to_string()),
            FamilySelection::Names(names) => FamilySpec::List(names),
        }
    }
}

/// Native detector configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectorOptions {
    /// Tag families to load.
    pub families: FamilySelection,
    /// Black border width (in bits) written into every loaded family.
    pub border: i32,
    /// Worker threads used by the native detector.
    pub nthreads: i32,
    /// Decimation factor applied before quad detection (1.0 = full resolution).
    pub quad_decimate: f32,
    /// Gaussian blur sigma applied before quad detection (0.0 = none).
    #[serde(alias = "quad_sigma")]
    pub quad_blur: f32,
    /// Snap quad edges to strong gradients.
    pub refine_edges: bool,
    /// Spend extra effort to increase the number of decoded tags.
    pub refine_decode: bool,
    /// Spend extra effort to improve the homography estimate.
    pub refine_pose: bool,
    /// Let the native library write its debug images.
    pub debug: bool,
    /// Use the contour-based quad detector.
    pub quad_contours: bool,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            families: FamilySelection::default(),
            border: 1,
            nthreads: 4,
            quad_decimate: 1.0,
            quad_blur: 0.0,
            refine_edges: true,
            refine_decode: false,
            refine_pose: false,
            debug: false,
            quad_contours: true,
        }
    }
}

impl DetectorOptions {
    /// Check value ranges before they reach native code.
    pub fn validate(&self) -> Result<()> {
        if self.nthreads < 1 {
            return Err(Error::InvalidOptions(format!(
                "nthreads must be >= 1, got {}",
                self.nthreads
            )));
        }
        if !self.quad_decimate.is_finite() || self.quad_decimate < 1.0 {
            return Err(Error::InvalidOptions(format!(
                "quad_decimate must be finite and >= 1.0, got {}",
                self.quad_decimate
            )));
        }
        if !self.quad_blur.is_finite() || self.quad_blur < 0.0 {
            return Err(Error::InvalidOptions(format!(
                "quad_blur must be finite and >= 0.0, got {}",
                self.quad_blur
            )));
        }
        if self.border < 0 {
            return Err(Error::InvalidOptions(format!(
                "border must be >= 0, got {}",
                self.border
            )));
        }
        if let FamilySelection::Names(names) = &self.families {
            if names.is_empty() {
                return Err(Error::InvalidOptions("no tag families selected".into()));
            }
        }
        Ok(())
    }

    /// Parse a JSON overlay on top of the defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Load a JSON overlay file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
