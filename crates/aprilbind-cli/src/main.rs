//! aprilbind CLI: detect AprilTags in image files through the native library.

mod overlay;

use aprilbind::{
    Detection, Detector, DetectorBackend, DetectorOptions, FamilySelection, NativeBackend,
};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "aprilbind")]
#[command(about = "Detect AprilTags in images using the native AprilTag library")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect tags in an image.
    Detect(CliDetectArgs),

    /// List the tag families the native library provides.
    Families,

    /// Print the effective detector options as JSON.
    Options(CliOptionsArgs),
}

#[derive(Debug, Clone, Args)]
struct CliDetectArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write detection results (JSON).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write the native library's rendering of the detections.
    #[arg(long)]
    vis: Option<PathBuf>,

    /// Path to write a color overlay of tag outlines on the input image.
    #[arg(long)]
    overlay: Option<PathBuf>,

    #[command(flatten)]
    options: CliOptionsArgs,
}

#[derive(Debug, Clone, Args, Default)]
struct CliOptionsArgs {
    /// JSON file with detector options; flags below override its values.
    #[arg(long = "options")]
    options_file: Option<PathBuf>,

    /// Tag families: "all", or names separated by spaces/commas.
    #[arg(short = 'f', long)]
    families: Option<String>,

    /// Tag border width in bits.
    #[arg(short = 'B', long)]
    border: Option<i32>,

    /// Number of native detector threads.
    #[arg(short = 't', long)]
    nthreads: Option<i32>,

    /// Decimation factor applied before quad detection.
    #[arg(short = 'x', long)]
    quad_decimate: Option<f32>,

    /// Gaussian blur sigma applied before quad detection.
    #[arg(short = 'b', long)]
    quad_blur: Option<f32>,

    /// Do not snap quad edges to strong gradients.
    #[arg(long)]
    no_refine_edges: bool,

    /// Spend more time trying to decode tags.
    #[arg(long)]
    refine_decode: bool,

    /// Spend more time trying to improve the homography.
    #[arg(long)]
    refine_pose: bool,

    /// Let the native library write its debug images.
    #[arg(long)]
    debug: bool,

    /// Use the legacy quad detector instead of contours.
    #[arg(long)]
    no_quad_contours: bool,
}

impl CliOptionsArgs {
    fn to_options(&self) -> CliResult<DetectorOptions> {
        let mut options = match &self.options_file {
            Some(path) => DetectorOptions::from_json_file(path).map_err(|e| -> CliError {
                format!("Failed to load options {}: {}", path.display(), e).into()
            })?,
            None => DetectorOptions::default(),
        };
        self.apply(&mut options);
        options.validate()?;
        Ok(options)
    }

    fn apply(&self, options: &mut DetectorOptions) {
        if let Some(families) = &self.families {
            options.families = FamilySelection::parse(families);
        }
        if let Some(v) = self.border {
            options.border = v;
        }
        if let Some(v) = self.nthreads {
            options.nthreads = v;
        }
        if let Some(v) = self.quad_decimate {
            options.quad_decimate = v;
        }
        if let Some(v) = self.quad_blur {
            options.quad_blur = v;
        }
        if self.no_refine_edges {
            options.refine_edges = false;
        }
        if self.refine_decode {
            options.refine_decode = true;
        }
        if self.refine_pose {
            options.refine_pose = true;
        }
        if self.debug {
            options.debug = true;
        }
        if self.no_quad_contours {
            options.quad_contours = false;
        }
    }
}

#[derive(serde::Serialize)]
struct DetectReport<'a> {
    image: String,
    image_size: [u32; 2],
    detections: &'a [Detection],
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => run_detect(&args),
        Commands::Families => run_families(),
        Commands::Options(args) => run_options(&args),
    }
}

// ── families ───────────────────────────────────────────────────────────

fn run_families() -> CliResult<()> {
    let backend = NativeBackend::new()?;
    println!("Native library: {}", backend.api().path.display());
    for name in backend.available_families()? {
        println!("  {name}");
    }
    Ok(())
}

// ── options ────────────────────────────────────────────────────────────

fn run_options(args: &CliOptionsArgs) -> CliResult<()> {
    println!("{}", args.to_options()?.to_json_pretty()?);
    Ok(())
}

// ── detect ─────────────────────────────────────────────────────────────

fn run_detect(args: &CliDetectArgs) -> CliResult<()> {
    tracing::info!("Loading image: {}", args.image.display());

    let img = image::open(&args.image).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", args.image.display(), e).into()
    })?;
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();

    tracing::info!("Image size: {}x{}", w, h);

    let options = args.options.to_options()?;
    let mut detector = Detector::with_options(options)?;

    let (detections, vis) = if args.vis.is_some() {
        let (d, v) = detector.detect_with_visualization(&gray)?;
        (d, Some(v))
    } else {
        (detector.detect(&gray)?, None)
    };

    tracing::info!("Detected {} tags", detections.len());
    print!("{}", format_detections(&detections));

    if let Some(out) = &args.out {
        let report = DetectReport {
            image: args.image.display().to_string(),
            image_size: [w, h],
            detections: &detections,
        };
        std::fs::write(out, serde_json::to_string_pretty(&report)?)?;
        tracing::info!("Results written to {}", out.display());
    }

    if let (Some(path), Some(vis)) = (&args.vis, vis) {
        save_image(path, || vis.save(path))?;
    }

    if let Some(path) = &args.overlay {
        let canvas = overlay::draw_detections(&gray, &detections);
        save_image(path, || canvas.save(path))?;
    }

    Ok(())
}

fn save_image(
    path: &Path,
    save: impl FnOnce() -> image::ImageResult<()>,
) -> CliResult<()> {
    save().map_err(|e| -> CliError {
        format!("Failed to write image {}: {}", path.display(), e).into()
    })?;
    tracing::info!("Image written to {}", path.display());
    Ok(())
}

/// `Detection i of n:` headers followed by indented detection blocks.
fn format_detections(detections: &[Detection]) -> String {
    let n = detections.len();
    let mut out = String::new();
    for (i, det) in detections.iter().enumerate() {
        out.push_str(&format!("Detection {} of {}:\n", i + 1, n));
        out.push_str(&det.to_string_indented(2));
        out.push_str("\n\n");
    }
    out
}
