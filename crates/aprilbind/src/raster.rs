//! Grayscale raster helpers for moving pixels in and out of native buffers.
//!
//! Native images keep rows `stride` bytes apart, with `stride >= width`.

use image::GrayImage;

use crate::error::{Error, Result};

/// Reject images the native detector cannot represent.
pub fn validate_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidImage {
            width,
            height,
            reason: "image must have non-zero width and height",
        });
    }
    if width > i32::MAX as u32 || height > i32::MAX as u32 {
        return Err(Error::InvalidImage {
            width,
            height,
            reason: "image dimensions exceed the native int range",
        });
    }
    Ok(())
}

/// Convert an array shape `(rows, cols)` into `(width, height)`.
pub fn dimensions_from_shape(rows: usize, cols: usize) -> Result<(u32, u32)> {
    match (u32::try_from(cols), u32::try_from(rows)) {
        (Ok(width), Ok(height)) => Ok((width, height)),
        _ => Err(Error::InvalidImage {
            width: u32::try_from(cols).unwrap_or(u32::MAX),
            height: u32::try_from(rows).unwrap_or(u32::MAX),
            reason: "array shape exceeds the u32 pixel range",
        }),
    }
}

/// Copy `src` row by row into `dst`, whose rows are `stride` bytes apart.
///
/// Padding bytes past `width` in each row are left untouched.
pub fn copy_to_strided(src: &GrayImage, dst: &mut [u8], stride: usize) -> Result<()> {
    let (w, h) = (src.width() as usize, src.height() as usize);
    check_layout(w, h, stride, dst.len())?;
    if w == 0 {
        return Ok(());
    }
    for (row, dst_row) in src.as_raw().chunks_exact(w).zip(dst.chunks_mut(stride)) {
        dst_row[..w].copy_from_slice(row);
    }
    Ok(())
}

/// Build an owned image from a strided buffer, dropping the padding columns.
pub fn gray_from_strided(buf: &[u8], width: u32, height: u32, stride: usize) -> Result<GrayImage> {
    let (w, h) = (width as usize, height as usize);
    check_layout(w, h, stride, buf.len())?;
    if w == 0 || h == 0 {
        return Ok(GrayImage::new(width, height));
    }
    let mut out = Vec::with_capacity(w * h);
    for row in buf.chunks(stride).take(h) {
        out.extend_from_slice(&row[..w]);
    }
    GrayImage::from_raw(width, height, out)
        .ok_or_else(|| Error::Marshal("strided buffer does not fill the image".into()))
}

fn check_layout(w: usize, h: usize, stride: usize, len: usize) -> Result<()> {
    if stride < w {
        return Err(Error::Marshal(format!("stride {stride} smaller than width {w}")));
    }
    // The last row only needs `w` bytes.
    let needed = if h == 0 { 0 } else { stride * (h - 1) + w };
    if len < needed {
        return Err(Error::Marshal(format!(
            "buffer of {len} bytes too small for {w}x{h} with stride {stride}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn ramp(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| Luma([(y * w + x) as u8]))
    }

    #[test]
    fn zero_sized_images_are_rejected() {
        assert!(matches!(
            validate_dimensions(0, 10),
            Err(Error::InvalidImage { width: 0, .. })
        ));
        assert!(validate_dimensions(10, 0).is_err());
        assert!(validate_dimensions(1, 1).is_ok());
    }

    #[test]
    fn array_shape_maps_rows_to_height() {
        assert_eq!(dimensions_from_shape(480, 640).unwrap(), (640, 480));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_array_shape_is_rejected() {
        let wide = u32::MAX as usize + 1;
        assert!(matches!(
            dimensions_from_shape(3, wide),
            Err(Error::InvalidImage { width: u32::MAX, height: 3, .. })
        ));
        assert!(dimensions_from_shape(wide, 3).is_err());
    }

    #[test]
    fn strided_copy_leaves_padding_untouched() {
        let img = ramp(3, 2);
        let mut dst = vec![0xEEu8; 8 * 2];
        copy_to_strided(&img, &mut dst, 8).unwrap();
        assert_eq!(&dst[..3], &[0, 1, 2]);
        assert_eq!(&dst[3..8], &[0xEE; 5]);
        assert_eq!(&dst[8..11], &[3, 4, 5]);
        assert_eq!(&dst[11..], &[0xEE; 5]);
    }

    #[test]
    fn strided_read_crops_padding() {
        let buf = [1u8, 2, 99, 99, 3, 4, 99, 99];
        let img = gray_from_strided(&buf, 2, 2, 4).unwrap();
        assert_eq!(img.as_raw(), &vec![1, 2, 3, 4]);
    }

    #[test]
    fn short_last_row_is_accepted() {
        let buf = [1u8, 2, 99, 3, 4];
        let img = gray_from_strided(&buf, 2, 2, 3).unwrap();
        assert_eq!(img.as_raw(), &vec![1, 2, 3, 4]);
    }

    #[test]
    fn layout_errors_are_reported() {
        let img = ramp(4, 2);
        let mut dst = vec![0u8; 6];
        assert!(matches!(copy_to_strided(&img, &mut dst, 2), Err(Error::Marshal(_))));
        assert!(matches!(copy_to_strided(&img, &mut dst, 4), Err(Error::Marshal(_))));
    }
}
