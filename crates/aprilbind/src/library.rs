//! Runtime loading of the native AprilTag library.
//!
//! Candidates are tried in order:
//! 1. the path in `APRILBIND_LIBRARY`, if set;
//! 2. the bare platform file name, resolved by the OS loader;
//! 3. the file name next to the running executable;
//! 4. `<cwd>/../build/lib/<file name>`.

use std::ffi::{c_char, c_int, c_uint};
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};

use crate::error::{Error, Result};
use crate::ffi::{ApriltagDetector, ApriltagFamily, ImageU8, ZArray};

/// Environment variable holding an explicit library path.
pub const LIBRARY_ENV: &str = "APRILBIND_LIBRARY";

/// Platform file name of the shared library.
pub fn library_file_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "libapriltag.dylib"
    } else if cfg!(target_os = "windows") {
        "apriltag.dll"
    } else {
        "libapriltag.so"
    }
}

/// Ordered list of paths to try.
pub fn candidate_paths(
    env_override: Option<PathBuf>,
    exe_dir: Option<&Path>,
    cwd: Option<&Path>,
) -> Vec<PathBuf> {
    let file = library_file_name();
    let mut out = Vec::with_capacity(4);
    out.extend(env_override);
    out.push(PathBuf::from(file));
    if let Some(dir) = exe_dir {
        out.push(dir.join(file));
    }
    if let Some(cwd) = cwd {
        out.push(cwd.join("..").join("build").join("lib").join(file));
    }
    out
}

/// Entry points resolved from the loaded library.
///
/// The function pointers are valid for as long as `_lib` is alive. `_lib` is
/// only `None` for in-process entry points that need no library handle.
pub struct NativeApi {
    pub path: PathBuf,
    pub detector_create: unsafe extern "C" fn() -> *mut ApriltagDetector,
    pub detector_destroy: unsafe extern "C" fn(*mut ApriltagDetector),
    pub detector_add_family: unsafe extern "C" fn(*mut ApriltagDetector, *mut ApriltagFamily),
    pub detector_enable_quad_contours: unsafe extern "C" fn(*mut ApriltagDetector, c_int),
    pub detector_detect: unsafe extern "C" fn(*mut ApriltagDetector, *mut ImageU8) -> *mut ZArray,
    pub detections_destroy: unsafe extern "C" fn(*mut ZArray),
    pub family_create: unsafe extern "C" fn(*const c_char) -> *mut ApriltagFamily,
    pub family_destroy: Option<unsafe extern "C" fn(*mut ApriltagFamily)>,
    pub family_list: unsafe extern "C" fn() -> *mut ZArray,
    pub family_list_destroy: Option<unsafe extern "C" fn(*mut ZArray)>,
    pub image_u8_create: unsafe extern "C" fn(c_uint, c_uint) -> *mut ImageU8,
    pub image_u8_destroy: unsafe extern "C" fn(*mut ImageU8),
    pub vis_detections: unsafe extern "C" fn(*mut ZArray, *mut ImageU8),
    pub(crate) _lib: Option<Library>,
}

impl NativeApi {
    /// Load from the default search path.
    pub fn load() -> Result<Self> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));
        let cwd = std::env::current_dir().ok();
        let candidates = candidate_paths(
            std::env::var_os(LIBRARY_ENV).map(PathBuf::from),
            exe_dir.as_deref(),
            cwd.as_deref(),
        );
        Self::load_first(&candidates)
    }

    /// Load the first candidate that opens.
    pub fn load_first(candidates: &[PathBuf]) -> Result<Self> {
        for path in candidates {
            // SAFETY: loading runs the library's initialisers; libapriltag has none
            // with side effects beyond allocation.
            match unsafe { Library::new(path) } {
                Ok(lib) => {
                    tracing::info!("Loaded native AprilTag library from {}", path.display());
                    return Self::resolve(lib, path.clone());
                }
                Err(e) => tracing::debug!("Cannot load {}: {}", path.display(), e),
            }
        }
        Err(Error::LibraryNotFound {
            tried: candidates.to_vec(),
        })
    }

    fn resolve(lib: Library, path: PathBuf) -> Result<Self> {
        // SAFETY: the signatures below match the native headers.
        unsafe {
            Ok(Self {
                detector_create: required(&lib, "apriltag_detector_create")?,
                detector_destroy: required(&lib, "apriltag_detector_destroy")?,
                detector_add_family: required(&lib, "apriltag_detector_add_family")?,
                detector_enable_quad_contours: required(
                    &lib,
                    "apriltag_detector_enable_quad_contours",
                )?,
                detector_detect: required(&lib, "apriltag_detector_detect")?,
                detections_destroy: required(&lib, "apriltag_detections_destroy")?,
                family_create: required(&lib, "apriltag_family_create")?,
                family_destroy: optional(&lib, "apriltag_family_destroy"),
                family_list: required(&lib, "apriltag_family_list")?,
                family_list_destroy: optional(&lib, "apriltag_family_list_destroy"),
                image_u8_create: required(&lib, "image_u8_create")?,
                image_u8_destroy: required(&lib, "image_u8_destroy")?,
                vis_detections: required(&lib, "apriltag_vis_detections")?,
                path,
                _lib: Some(lib),
            })
        }
    }
}

unsafe fn required<T: Copy>(lib: &Library, symbol: &'static str) -> Result<T> {
    let sym: Symbol<T> = lib
        .get(symbol.as_bytes())
        .map_err(|source| Error::MissingSymbol { symbol, source })?;
    Ok(*sym)
}

unsafe fn optional<T: Copy>(lib: &Library, symbol: &'static str) -> Option<T> {
    match lib.get::<T>(symbol.as_bytes()) {
        Ok(sym) => Some(*sym),
        Err(_) => {
            tracing::debug!("Optional symbol `{}` not exported", symbol);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_order_prefers_override_then_os_loader() {
        let c = candidate_paths(
            Some(PathBuf::from("/opt/custom/libapriltag.so")),
            Some(Path::new("/usr/local/bin")),
            Some(Path::new("/work/app")),
        );
        let file = library_file_name();
        assert_eq!(
            c,
            vec![
                PathBuf::from("/opt/custom/libapriltag.so"),
                PathBuf::from(file),
                Path::new("/usr/local/bin").join(file),
                Path::new("/work/app/../build/lib").join(file),
            ]
        );
    }

    #[test]
    fn search_skips_unknown_locations() {
        let c = candidate_paths(None, None, None);
        assert_eq!(c, vec![PathBuf::from(library_file_name())]);
    }

    #[test]
    fn missing_library_lists_every_candidate() {
        let candidates = vec![
            PathBuf::from("/nonexistent/aprilbind/a/libapriltag.so"),
            PathBuf::from("/nonexistent/aprilbind/b/libapriltag.so"),
        ];
        match NativeApi::load_first(&candidates) {
            Err(Error::LibraryNotFound { tried }) => assert_eq!(tried, candidates),
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("nonexistent library loaded"),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    #[test]
    fn library_without_entry_points_names_missing_symbol() {
        // Any loadable library lacking the AprilTag exports will do.
        let path = PathBuf::from("libc.so.6");
        let lib = unsafe { Library::new(&path) }.unwrap();
        match NativeApi::resolve(lib, path) {
            Err(err @ Error::MissingSymbol { symbol, .. }) => {
                assert_eq!(symbol, "apriltag_detector_create");
                assert!(err.to_string().contains("apriltag_detector_create"));
            }
            Err(e) => panic!("unexpected error: {e}"),
            Ok(_) => panic!("libc resolved as AprilTag"),
        }
    }
}
