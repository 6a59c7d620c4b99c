//! Color overlay of detections on the input image.

use aprilbind::Detection;
use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

const OUTLINE: Rgb<u8> = Rgb([0, 220, 0]);
/// Edge from corner 0 to corner 1, marks tag orientation.
const FIRST_EDGE: Rgb<u8> = Rgb([230, 30, 30]);
const CENTER: Rgb<u8> = Rgb([30, 90, 230]);

/// Draw every detection's outline and center onto an RGB copy of `gray`.
pub fn draw_detections(gray: &GrayImage, detections: &[Detection]) -> RgbImage {
    let mut canvas = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y)[0];
        Rgb([v, v, v])
    });

    for det in detections {
        for i in 0..4 {
            let a = det.corners[i];
            let b = det.corners[(i + 1) % 4];
            let color = if i == 0 { FIRST_EDGE } else { OUTLINE };
            draw_line_segment_mut(
                &mut canvas,
                (a[0] as f32, a[1] as f32),
                (b[0] as f32, b[1] as f32),
                color,
            );
        }
        let c = (det.center[0].round() as i32, det.center[1].round() as i32);
        draw_hollow_circle_mut(&mut canvas, c, 3, CENTER);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: i32, cx: f64, cy: f64, half: f64) -> Detection {
        Detection {
            tag_family: "tag36h11".into(),
            tag_id: id,
            hamming: 0,
            goodness: 0.0,
            decision_margin: 40.0,
            homography: [[half, 0.0, cx], [0.0, half, cy], [0.0, 0.0, 1.0]],
            center: [cx, cy],
            corners: [
                [cx - half, cy + half],
                [cx + half, cy + half],
                [cx + half, cy - half],
                [cx - half, cy - half],
            ],
        }
    }

    #[test]
    fn outline_and_orientation_edge_are_drawn() {
        let gray = GrayImage::new(64, 64);
        let out = draw_detections(&gray, &[square(1, 32.0, 32.0, 10.0)]);
        // Corner 0 -> 1 runs along y = 42.
        assert_eq!(*out.get_pixel(32, 42), FIRST_EDGE);
        // Corner 1 -> 2 runs along x = 42.
        assert_eq!(*out.get_pixel(42, 32), OUTLINE);
        // Circle of radius 3 around the center.
        assert_eq!(*out.get_pixel(35, 32), CENTER);
        // Untouched background keeps the gray value.
        assert_eq!(*out.get_pixel(2, 2), Rgb([0, 0, 0]));
    }

    #[test]
    fn no_detections_is_plain_gray_copy() {
        let gray = GrayImage::from_pixel(8, 4, image::Luma([77]));
        let out = draw_detections(&gray, &[]);
        assert!(out.pixels().all(|p| *p == Rgb([77, 77, 77])));
    }
}
