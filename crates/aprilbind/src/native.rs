//! [`DetectorBackend`] over the dynamically loaded native library.

use std::ffi::{c_int, CString};
use std::sync::Arc;

use image::GrayImage;

use crate::backend::{DetectOutput, DetectorBackend};
use crate::error::{Error, Result};
use crate::ffi::{self, ApriltagDetection, ApriltagDetector, ApriltagFamily, ImageU8, ZArray};
use crate::library::NativeApi;
use crate::options::DetectorOptions;
use crate::raster;

/// Owns one native detector and the families loaded into it.
pub struct NativeBackend {
    detector: *mut ApriltagDetector,
    families: Vec<*mut ApriltagFamily>,
    api: Arc<NativeApi>,
}

// SAFETY: the native detector has no thread affinity; `&mut self` on every
// mutating call keeps access exclusive.
unsafe impl Send for NativeBackend {}

impl NativeBackend {
    /// Load the native library from the default search path and create a detector.
    pub fn new() -> Result<Self> {
        Self::with_api(Arc::new(NativeApi::load()?))
    }

    /// Create a detector from an already loaded library.
    pub fn with_api(api: Arc<NativeApi>) -> Result<Self> {
        // SAFETY: plain constructor call.
        let detector = unsafe { (api.detector_create)() };
        if detector.is_null() {
            return Err(Error::NullPointer("apriltag_detector_create"));
        }
        Ok(Self {
            detector,
            families: Vec::new(),
            api,
        })
    }

    pub fn api(&self) -> &Arc<NativeApi> {
        &self.api
    }

    fn create_image(&self, width: u32, height: u32) -> Result<NativeImage<'_>> {
        // SAFETY: dimensions were validated to be non-zero.
        let ptr = unsafe { (self.api.image_u8_create)(width, height) };
        if ptr.is_null() {
            return Err(Error::NullPointer("image_u8_create"));
        }
        Ok(NativeImage {
            api: &self.api,
            ptr,
        })
    }
}

impl DetectorBackend for NativeBackend {
    fn available_families(&self) -> Result<Vec<String>> {
        // SAFETY: the list is a zarray of C strings owned by us until destroyed.
        unsafe {
            let list = (self.api.family_list)();
            if list.is_null() {
                return Err(Error::NullPointer("apriltag_family_list"));
            }
            let names = ffi::zarray_strings(list);
            match self.api.family_list_destroy {
                Some(destroy) => destroy(list),
                None => tracing::debug!("apriltag_family_list_destroy unavailable; list leaked"),
            }
            names
        }
    }

    fn configure(&mut self, options: &DetectorOptions) -> Result<()> {
        // SAFETY: `detector` is live for the lifetime of `self`.
        unsafe {
            let d = &mut *self.detector;
            d.nthreads = options.nthreads;
            d.quad_decimate = options.quad_decimate;
            d.quad_sigma = options.quad_blur;
            d.refine_edges = c_int::from(options.refine_edges);
            d.refine_decode = c_int::from(options.refine_decode);
            d.refine_pose = c_int::from(options.refine_pose);
            d.debug = c_int::from(options.debug);
            (self.api.detector_enable_quad_contours)(
                self.detector,
                c_int::from(options.quad_contours),
            );
        }
        tracing::debug!(
            "Configured native detector: nthreads={} decimate={} sigma={}",
            options.nthreads,
            options.quad_decimate,
            options.quad_blur
        );
        Ok(())
    }

    fn add_family(&mut self, name: &str, border: i32) -> Result<()> {
        let c_name = CString::new(name).map_err(|_| Error::UnknownFamily(name.to_string()))?;
        // SAFETY: `c_name` outlives the call; the family pointer is kept alive
        // in `self.families` until after the detector is destroyed.
        unsafe {
            let family = (self.api.family_create)(c_name.as_ptr());
            if family.is_null() {
                return Err(Error::UnknownFamily(name.to_string()));
            }
            (*family).black_border = border;
            (self.api.detector_add_family)(self.detector, family);
            self.families.push(family);
        }
        tracing::debug!("Added tag family {} (border {})", name, border);
        Ok(())
    }

    fn detect(&mut self, image: &GrayImage, visualize: bool) -> Result<DetectOutput> {
        let (w, h) = image.dimensions();
        raster::validate_dimensions(w, h)?;

        let input = self.create_image(w, h)?;
        // SAFETY: the native image owns `stride * height` bytes.
        unsafe { raster::copy_to_strided(image, input.pixels_mut()?, input.stride()?)? };

        // SAFETY: detector and image are live; the result is owned by the guard.
        let raw = unsafe { (self.api.detector_detect)(self.detector, input.ptr) };
        if raw.is_null() {
            return Err(Error::NullPointer("apriltag_detector_detect"));
        }
        let found = NativeDetections {
            api: &self.api,
            ptr: raw,
        };

        let detections = found.to_owned_detections()?;
        tracing::debug!("Native detector returned {} detection(s)", detections.len());

        let visualization = if visualize {
            let canvas = self.create_image(w, h)?;
            // SAFETY: both pointers are live native objects.
            unsafe {
                (self.api.vis_detections)(found.ptr, canvas.ptr);
                let stride = canvas.stride()?;
                Some(raster::gray_from_strided(canvas.pixels_mut()?, w, h, stride)?)
            }
        } else {
            None
        };

        Ok(DetectOutput {
            detections,
            visualization,
        })
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        // SAFETY: families must outlive the detector that references them.
        unsafe {
            (self.api.detector_destroy)(self.detector);
            match self.api.family_destroy {
                Some(destroy) => self.families.drain(..).for_each(|f| destroy(f)),
                None if !self.families.is_empty() => {
                    tracing::debug!("apriltag_family_destroy unavailable; families leaked")
                }
                None => {}
            }
        }
    }
}

/// Native `image_u8_t`, destroyed on drop.
struct NativeImage<'a> {
    api: &'a NativeApi,
    ptr: *mut ImageU8,
}

impl NativeImage<'_> {
    unsafe fn stride(&self) -> Result<usize> {
        let stride = (*self.ptr).stride;
        usize::try_from(stride).map_err(|_| Error::Marshal(format!("negative stride {stride}")))
    }

    #[allow(clippy::mut_from_ref)]
    unsafe fn pixels_mut(&self) -> Result<&mut [u8]> {
        let img = &*self.ptr;
        if img.buf.is_null() {
            return Err(Error::NullPointer("image_u8_create buffer"));
        }
        let len = self.stride()? * img.height.max(0) as usize;
        Ok(std::slice::from_raw_parts_mut(img.buf, len))
    }
}

impl Drop for NativeImage<'_> {
    fn drop(&mut self) {
        // SAFETY: created by image_u8_create and not freed elsewhere.
        unsafe { (self.api.image_u8_destroy)(self.ptr) }
    }
}

/// Native detection list, destroyed on drop.
struct NativeDetections<'a> {
    api: &'a NativeApi,
    ptr: *mut ZArray,
}

impl NativeDetections<'_> {
    fn to_owned_detections(&self) -> Result<Vec<crate::Detection>> {
        // SAFETY: the zarray holds `apriltag_detection_t *` entries.
        unsafe {
            (0..ffi::zarray_len(self.ptr))
                .map(|i| {
                    let det: *const ApriltagDetection = ffi::zarray_get(self.ptr, i)?;
                    ffi::detection_from_native(det)
                })
                .collect()
        }
    }
}

impl Drop for NativeDetections<'_> {
    fn drop(&mut self) {
        // SAFETY: returned by apriltag_detector_detect and not freed elsewhere.
        unsafe { (self.api.detections_destroy)(self.ptr) }
    }
}
