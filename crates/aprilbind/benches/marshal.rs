use aprilbind::raster::{copy_to_strided, gray_from_strided};
use aprilbind::Detection;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};

const W: u32 = 1280;
const H: u32 = 720;
// Native rows are padded to a multiple of 96 bytes.
const STRIDE: usize = 1344;

fn frame() -> GrayImage {
    GrayImage::from_fn(W, H, |x, y| Luma([((x * 7 + y * 3) & 0xFF) as u8]))
}

fn bench_strided(c: &mut Criterion) {
    let img = frame();
    let mut native = vec![0u8; STRIDE * H as usize];

    c.bench_function("copy_to_strided_720p", |b| {
        b.iter(|| copy_to_strided(black_box(&img), black_box(&mut native), STRIDE).unwrap())
    });

    copy_to_strided(&img, &mut native, STRIDE).unwrap();
    c.bench_function("gray_from_strided_720p", |b| {
        b.iter(|| gray_from_strided(black_box(&native), W, H, STRIDE).unwrap())
    });
}

fn bench_format(c: &mut Criterion) {
    let det = Detection {
        tag_family: "tag36h11".to_string(),
        tag_id: 17,
        hamming: 0,
        goodness: 0.0,
        decision_margin: 74.5,
        homography: [[21.3, -1.2, 640.1], [0.8, 20.9, 360.4], [0.001, 0.0002, 1.0]],
        center: [640.1, 360.4],
        corners: [[619.0, 381.0], [661.0, 382.0], [662.0, 339.0], [618.0, 340.0]],
    };
    c.bench_function("detection_to_string", |b| {
        b.iter(|| black_box(&det).to_string_indented(2))
    });
}

criterion_group!(benches, bench_strided, bench_format);
criterion_main!(benches);
