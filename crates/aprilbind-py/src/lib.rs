use aprilbind::{DetectorOptions, FamilySelection};
use image::GrayImage;
use numpy::ndarray::{arr1, arr2, Ix2};
use numpy::{IntoPyArray, PyArray1, PyArray2, PyReadonlyArrayDyn};
use pyo3::exceptions::{PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyList;

fn py_error(err: aprilbind::Error) -> PyErr {
    use aprilbind::Error as E;
    match err {
        E::LibraryNotFound { .. } | E::MissingSymbol { .. } | E::Io(_) => {
            PyOSError::new_err(err.to_string())
        }
        E::UnknownFamily(_) | E::InvalidImage { .. } | E::InvalidOptions(_) | E::Json(_) => {
            PyValueError::new_err(err.to_string())
        }
        E::NullPointer(_) | E::Marshal(_) => PyRuntimeError::new_err(err.to_string()),
    }
}

fn gray_image_from_array(array: PyReadonlyArrayDyn<'_, u8>) -> PyResult<GrayImage> {
    let view = array
        .as_array()
        .into_dimensionality::<Ix2>()
        .map_err(|_| PyValueError::new_err("expected a grayscale image array with shape (H, W)"))?;
    let (h, w) = view.dim();
    let (width, height) = aprilbind::raster::dimensions_from_shape(h, w).map_err(py_error)?;
    // Row-major copy regardless of the input's strides.
    let out: Vec<u8> = view.iter().copied().collect();
    GrayImage::from_raw(width, height, out)
        .ok_or_else(|| PyRuntimeError::new_err("failed to build grayscale image"))
}

/// Families argument: a family string ("all", "tag36h11 tag25h9") or a list.
#[derive(FromPyObject)]
enum FamiliesArg {
    Text(String),
    List(Vec<String>),
}

impl From<FamiliesArg> for FamilySelection {
    fn from(arg: FamiliesArg) -> Self {
        match arg {
            FamiliesArg::Text(text) => FamilySelection::parse(&text),
            FamiliesArg::List(names) => FamilySelection::Names(names),
        }
    }
}

#[pyclass(module = "apriltag", name = "DetectorOptions")]
#[derive(Clone)]
struct PyDetectorOptions {
    inner: DetectorOptions,
}

#[pymethods]
impl PyDetectorOptions {
    #[new]
    #[pyo3(signature = (
        families=None,
        border=1,
        nthreads=4,
        quad_decimate=1.0,
        quad_blur=0.0,
        refine_edges=true,
        refine_decode=false,
        refine_pose=false,
        debug=false,
        quad_contours=true
    ))]
    #[allow(clippy::too_many_arguments)]
    fn new(
        families: Option<FamiliesArg>,
        border: i32,
        nthreads: i32,
        quad_decimate: f32,
        quad_blur: f32,
        refine_edges: bool,
        refine_decode: bool,
        refine_pose: bool,
        debug: bool,
        quad_contours: bool,
    ) -> PyResult<Self> {
        let inner = DetectorOptions {
            families: families.map(Into::into).unwrap_or_default(),
            border,
            nthreads,
            quad_decimate,
            quad_blur,
            refine_edges,
            refine_decode,
            refine_pose,
            debug,
            quad_contours,
        };
        inner.validate().map_err(py_error)?;
        Ok(Self { inner })
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        Ok(Self {
            inner: DetectorOptions::from_json_str(json).map_err(py_error)?,
        })
    }

    fn to_json(&self) -> PyResult<String> {
        self.inner.to_json_pretty().map_err(py_error)
    }

    #[getter]
    fn families(&self) -> String {
        self.inner.families.to_string()
    }
    #[getter]
    fn border(&self) -> i32 {
        self.inner.border
    }
    #[getter]
    fn nthreads(&self) -> i32 {
        self.inner.nthreads
    }
    #[getter]
    fn quad_decimate(&self) -> f32 {
        self.inner.quad_decimate
    }
    #[getter]
    fn quad_blur(&self) -> f32 {
        self.inner.quad_blur
    }
    /// Same value as `quad_blur`, under the native field name.
    #[getter]
    fn quad_sigma(&self) -> f32 {
        self.inner.quad_blur
    }
    #[getter]
    fn refine_edges(&self) -> bool {
        self.inner.refine_edges
    }
    #[getter]
    fn refine_decode(&self) -> bool {
        self.inner.refine_decode
    }
    #[getter]
    fn refine_pose(&self) -> bool {
        self.inner.refine_pose
    }
    #[getter]
    fn debug(&self) -> bool {
        self.inner.debug
    }
    #[getter]
    fn quad_contours(&self) -> bool {
        self.inner.quad_contours
    }

    fn __repr__(&self) -> String {
        format!("DetectorOptions({:?})", self.inner)
    }
}

#[pyclass(module = "apriltag", name = "Detection", frozen)]
struct PyDetection {
    inner: aprilbind::Detection,
}

#[pymethods]
impl PyDetection {
    #[getter]
    fn tag_family(&self) -> &str {
        &self.inner.tag_family
    }
    #[getter]
    fn tag_id(&self) -> i32 {
        self.inner.tag_id
    }
    #[getter]
    fn hamming(&self) -> i32 {
        self.inner.hamming
    }
    #[getter]
    fn goodness(&self) -> f32 {
        self.inner.goodness
    }
    #[getter]
    fn decision_margin(&self) -> f32 {
        self.inner.decision_margin
    }
    /// 3x3 float64 array.
    #[getter]
    fn homography<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        arr2(&self.inner.homography).into_pyarray_bound(py)
    }
    /// Length-2 float64 array.
    #[getter]
    fn center<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f64>> {
        arr1(&self.inner.center).into_pyarray_bound(py)
    }
    /// 4x2 float64 array.
    #[getter]
    fn corners<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray2<f64>> {
        arr2(&self.inner.corners).into_pyarray_bound(py)
    }

    #[pyo3(signature = (indent=0))]
    fn tostring(&self, indent: usize) -> String {
        self.inner.to_string_indented(indent)
    }

    fn to_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }

    fn __repr__(&self) -> String {
        format!(
            "Detection(tag_family={:?}, tag_id={}, hamming={}, decision_margin={})",
            self.inner.tag_family, self.inner.tag_id, self.inner.hamming, self.inner.decision_margin
        )
    }
}

#[pyclass(module = "apriltag", name = "Detector")]
struct PyDetector {
    inner: aprilbind::Detector,
}

#[pymethods]
impl PyDetector {
    #[new]
    #[pyo3(signature = (options=None))]
    fn new(options: Option<PyRef<'_, PyDetectorOptions>>) -> PyResult<Self> {
        let options = options.map(|o| o.inner.clone()).unwrap_or_default();
        Ok(Self {
            inner: aprilbind::Detector::with_options(options).map_err(py_error)?,
        })
    }

    /// Options the detector was created with.
    #[getter]
    fn options(&self) -> PyDetectorOptions {
        PyDetectorOptions {
            inner: self.inner.options().clone(),
        }
    }

    /// Every family the native library provides.
    #[getter]
    fn families(&self) -> PyResult<Vec<String>> {
        self.inner.families().map_err(py_error)
    }

    fn add_tag_family(&mut self, name: &str) -> PyResult<()> {
        self.inner.add_tag_family(name).map_err(py_error)
    }

    /// Detect tags in a 2-D uint8 array. With `return_image=True` returns
    /// `(detections, image)` where `image` renders the detections.
    #[pyo3(signature = (img, return_image=false))]
    fn detect(
        &mut self,
        py: Python<'_>,
        img: PyReadonlyArrayDyn<'_, u8>,
        return_image: bool,
    ) -> PyResult<PyObject> {
        let gray = gray_image_from_array(img)?;
        let detector = &mut self.inner;

        let (found, vis) = if return_image {
            let (d, v) = py
                .allow_threads(|| detector.detect_with_visualization(&gray))
                .map_err(py_error)?;
            (d, Some(v))
        } else {
            let d = py.allow_threads(|| detector.detect(&gray)).map_err(py_error)?;
            (d, None)
        };

        let list = PyList::empty_bound(py);
        for det in found {
            list.append(Py::new(py, PyDetection { inner: det })?)?;
        }

        match vis {
            None => Ok(list.into_any().unbind()),
            Some(v) => {
                let (w, h) = v.dimensions();
                let pixels = numpy::ndarray::Array2::from_shape_vec((h as usize, w as usize), v.into_raw())
                    .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
                let image = pixels.into_pyarray_bound(py);
                Ok((list, image).into_py(py))
            }
        }
    }
}

#[pyfunction]
fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pymodule]
fn apriltag(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyDetectorOptions>()?;
    m.add_class::<PyDetection>()?;
    m.add_class::<PyDetector>()?;

    m.add_function(wrap_pyfunction!(package_version, m)?)?;
    Ok(())
}
