//! `#[repr(C)]` mirrors of the native structures and the unsafe readers that
//! copy them into owned Rust values.
//!
//! Only the leading fields the binding touches are declared; the native
//! structures are always handled through pointers, never by value.

#![allow(non_snake_case)]

use std::ffi::{c_char, c_int, c_uint, CStr};
use std::mem::size_of;
use std::ptr;

use crate::detection::Detection;
use crate::error::{Error, Result};

/// `image_u8_t`.
#[repr(C)]
pub struct ImageU8 {
    pub width: c_int,
    pub height: c_int,
    pub stride: c_int,
    pub buf: *mut u8,
}

/// `matd_t`: row-major matrix header followed by `nrows * ncols` doubles.
#[repr(C)]
pub struct Matd {
    pub nrows: c_uint,
    pub ncols: c_uint,
    pub data: [f64; 0],
}

/// `zarray_t`.
#[repr(C)]
pub struct ZArray {
    pub el_sz: usize,
    pub size: c_int,
    pub alloc: c_int,
    pub data: *mut c_char,
}

/// `apriltag_family_t` (leading fields).
#[repr(C)]
pub struct ApriltagFamily {
    pub ncodes: u32,
    pub codes: *mut u64,
    pub black_border: i32,
    pub d: i32,
    pub h: i32,
    pub name: *mut c_char,
}

/// `apriltag_detection_t`.
#[repr(C)]
pub struct ApriltagDetection {
    pub family: *mut ApriltagFamily,
    pub id: c_int,
    pub hamming: c_int,
    pub goodness: f32,
    pub decision_margin: f32,
    pub H: *mut Matd,
    pub c: [f64; 2],
    pub p: [[f64; 2]; 4],
}

/// `apriltag_detector_t` (leading tuning fields).
#[repr(C)]
pub struct ApriltagDetector {
    pub nthreads: c_int,
    pub quad_decimate: f32,
    pub quad_sigma: f32,
    pub refine_edges: c_int,
    pub refine_decode: c_int,
    pub refine_pose: c_int,
    pub debug: c_int,
    pub quad_contours: c_int,
}

/// Copy element `idx` out of a zarray holding values of type `T`.
///
/// # Safety
/// `za` must point to a live zarray whose `data` holds `size` elements of
/// `el_sz` bytes each.
pub unsafe fn zarray_get<T: Copy>(za: *const ZArray, idx: usize) -> Result<T> {
    let za = za
        .as_ref()
        .ok_or(Error::Marshal("null zarray".into()))?;
    if za.el_sz != size_of::<T>() {
        return Err(Error::Marshal(format!(
            "zarray element size {} does not match expected {}",
            za.el_sz,
            size_of::<T>()
        )));
    }
    if za.size < 0 || idx >= za.size as usize {
        return Err(Error::Marshal(format!(
            "zarray index {idx} out of bounds (size {})",
            za.size
        )));
    }
    let src = za.data.add(idx * za.el_sz) as *const T;
    Ok(ptr::read_unaligned(src))
}

/// Number of elements in a zarray; 0 for a null pointer.
///
/// # Safety
/// `za` must be null or point to a live zarray.
pub unsafe fn zarray_len(za: *const ZArray) -> usize {
    za.as_ref().map_or(0, |z| z.size.max(0) as usize)
}

/// Read a zarray of `char *` into owned strings.
///
/// # Safety
/// Same as [`zarray_get`]; every element must be a valid NUL-terminated string.
pub unsafe fn zarray_strings(za: *const ZArray) -> Result<Vec<String>> {
    (0..zarray_len(za))
        .map(|i| {
            let s: *const c_char = zarray_get(za, i)?;
            c_string(s, "family name")
        })
        .collect()
}

/// Copy a native detection into an owned [`Detection`].
///
/// # Safety
/// `det` must point to a live `apriltag_detection_t` whose family and
/// homography pointers are valid.
pub unsafe fn detection_from_native(det: *const ApriltagDetection) -> Result<Detection> {
    let det = det
        .as_ref()
        .ok_or(Error::Marshal("null detection".into()))?;
    let family = det
        .family
        .as_ref()
        .ok_or(Error::Marshal("detection without family".into()))?;

    Ok(Detection {
        tag_family: c_string(family.name, "family name")?,
        tag_id: det.id,
        hamming: det.hamming,
        goodness: det.goodness,
        decision_margin: det.decision_margin,
        homography: matd_3x3(det.H)?,
        center: det.c,
        corners: det.p,
    })
}

unsafe fn matd_3x3(m: *const Matd) -> Result<[[f64; 3]; 3]> {
    let header = m
        .as_ref()
        .ok_or(Error::Marshal("detection without homography".into()))?;
    if header.nrows != 3 || header.ncols != 3 {
        return Err(Error::Marshal(format!(
            "homography is {}x{}, expected 3x3",
            header.nrows, header.ncols
        )));
    }
    let data = ptr::addr_of!((*m).data) as *const f64;
    let mut out = [[0.0; 3]; 3];
    for (r, row) in out.iter_mut().enumerate() {
        for (c, v) in row.iter_mut().enumerate() {
            *v = ptr::read_unaligned(data.add(r * 3 + c));
        }
    }
    Ok(out)
}

unsafe fn c_string(s: *const c_char, what: &str) -> Result<String> {
    if s.is_null() {
        return Err(Error::Marshal(format!("null {what}")));
    }
    Ok(CStr::from_ptr(s).to_string_lossy().into_owned())
}
