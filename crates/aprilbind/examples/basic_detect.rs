use aprilbind::{Detector, DetectorOptions};
use image::ImageReader;
use std::error::Error;
use std::path::Path;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <image.png> [options.json]", args[0]);
        std::process::exit(2);
    }

    let image = ImageReader::open(&args[1])?.decode()?.to_luma8();
    let options = match args.get(2) {
        Some(path) => DetectorOptions::from_json_file(Path::new(path))?,
        None => DetectorOptions::default(),
    };

    let mut detector = Detector::with_options(options)?;
    let detections = detector.detect(&image)?;

    println!("Detected {} tags.", detections.len());
    for (i, det) in detections.iter().enumerate() {
        println!("Detection {} of {}:", i + 1, detections.len());
        println!("{}", det.to_string_indented(2));
        println!();
    }
    Ok(())
}
