use crate::tissue_model::{TissueModel, TissueModelError};

use ndarray::{Array3, s};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelLoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid tissue model: {0}")]
    Model(#[from] TissueModelError),

    #[error("Model source error: {0}")]
    Source(String),
}

/// Tissue maps as stored on disk: relaxation times in seconds, spacing in
/// metres, axes in the source convention.
#[derive(Clone, Debug)]
pub struct RawTissueMaps {
    pub t1: Array3<f64>,
    pub t2: Array3<f64>,
    pub t2_star: Array3<f64>,
    pub rho: Array3<f64>,
    pub x_dim_res: f64,
    pub y_dim_res: f64,
    pub z_dim_res: f64,
}

/// Reads raw tissue maps from some storage format.
pub trait ModelSource {
    fn read(&self, path: &Path) -> Result<RawTissueMaps, ModelLoaderError>;
}

const SECONDS_TO_MS: f64 = 1000.0;
const METRES_TO_MM: f64 = 1000.0;

pub struct ModelLoader;

impl ModelLoader {
    /// Load a model through `source` and bring it into the LPS/mm/ms frame
    ///
    /// # Errors
    ///
    /// Returns error if the source fails or the maps are inconsistent
    pub fn load(
        source: &impl ModelSource,
        path: impl AsRef<Path>,
    ) -> Result<TissueModel, ModelLoaderError> {
        let path = path.as_ref();
        log::info!("Loading tissue model: {}", path.display());
        let raw = source.read(path).inspect_err(|err| log::error!("{err}"))?;
        Self::from_raw(raw)
    }

    /// Convert raw maps into a [`TissueModel`]
    ///
    /// Relaxation times go from seconds to milliseconds and spacing from
    /// metres to millimetres. Every map is turned 180° about the first array
    /// axis, which takes the source axes onto LPS.
    pub fn from_raw(raw: RawTissueMaps) -> Result<TissueModel, ModelLoaderError> {
        let RawTissueMaps {
            t1,
            t2,
            t2_star,
            rho,
            x_dim_res,
            y_dim_res,
            z_dim_res,
        } = raw;

        let spacing = [x_dim_res, y_dim_res, z_dim_res].map(|r| r * METRES_TO_MM);
        let t1 = Self::to_lps(&t1) * SECONDS_TO_MS;
        let t2 = Self::to_lps(&t2) * SECONDS_TO_MS;
        let t2_star = Self::to_lps(&t2_star) * SECONDS_TO_MS;
        let pd = Self::to_lps(&rho);

        let model = TissueModel::new(t1, t2, t2_star, pd, spacing)?;
        log::debug!(
            "Tissue model {:?} voxels, spacing {:?} mm",
            model.dim(),
            model.spacing()
        );
        Ok(model)
    }

    fn to_lps(map: &Array3<f64>) -> Array3<f64> {
        map.slice(s![.., ..;-1, ..;-1]).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;
    use ndarray::Array;

    fn ramp(dim: (usize, usize, usize)) -> Array3<f64> {
        let n = dim.0 * dim.1 * dim.2;
        Array::range(0.0, n as f64, 1.0).into_shape_with_order(dim).unwrap()
    }

    fn raw(dim: (usize, usize, usize)) -> RawTissueMaps {
        RawTissueMaps {
            t1: ramp(dim) * 0.001,
            t2: Array3::from_elem(dim, 0.08),
            t2_star: Array3::from_elem(dim, 0.05),
            rho: ramp(dim),
            x_dim_res: 0.001,
            y_dim_res: 0.002,
            z_dim_res: 0.003,
        }
    }

    struct InMemory(RawTissueMaps);

    impl ModelSource for InMemory {
        fn read(&self, _path: &Path) -> Result<RawTissueMaps, ModelLoaderError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl ModelSource for Failing {
        fn read(&self, path: &Path) -> Result<RawTissueMaps, ModelLoaderError> {
            Err(ModelLoaderError::Source(format!("cannot decode {}", path.display())))
        }
    }

    /// Reads the whole file but decodes no format
    struct OnDisk;

    impl ModelSource for OnDisk {
        fn read(&self, path: &Path) -> Result<RawTissueMaps, ModelLoaderError> {
            let bytes = std::fs::read(path)?;
            Err(ModelLoaderError::Source(format!("{} bytes of unknown format", bytes.len())))
        }
    }

    #[test]
    fn units_are_converted_to_ms_and_mm() {
        let model = ModelLoader::from_raw(raw((2, 2, 2))).unwrap();
        assert_float_eq!(model.spacing(), [1.0, 2.0, 3.0], abs_all <= 1e-12);
        assert_float_eq!(model.t2()[[0, 0, 0]], 80.0, abs <= 1e-9);
        assert_float_eq!(model.t2_star()[[1, 1, 1]], 50.0, abs <= 1e-9);
    }

    #[test]
    fn maps_are_turned_about_the_first_axis() {
        let dim = (2, 3, 4);
        let source = raw(dim);
        let model = ModelLoader::from_raw(source.clone()).unwrap();
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(model.pd()[[i, j, k]], source.rho[[i, 2 - j, 3 - k]]);
                    assert_float_eq!(
                        model.t1()[[i, j, k]],
                        source.t1[[i, 2 - j, 3 - k]] * 1000.0,
                        abs <= 1e-9
                    );
                }
            }
        }
    }

    #[test]
    fn inconsistent_maps_are_rejected() {
        let mut maps = raw((2, 2, 2));
        maps.t2 = Array3::zeros((2, 2, 3));
        let result = ModelLoader::from_raw(maps);
        assert!(matches!(
            result,
            Err(ModelLoaderError::Model(TissueModelError::InconsistentDimensions))
        ));
    }

    #[test]
    fn load_goes_through_the_source() {
        let model = ModelLoader::load(&InMemory(raw((3, 3, 3))), "phantom.mat").unwrap();
        assert_eq!(model.dim(), (3, 3, 3));
        assert!(matches!(
            ModelLoader::load(&Failing, "phantom.mat"),
            Err(ModelLoaderError::Source(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ModelLoader::load(&OnDisk, dir.path().join("missing.mat"));
        assert!(matches!(
            result,
            Err(ModelLoaderError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound
        ));
    }

    #[test]
    fn unreadable_contents_come_from_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("phantom.mat");
        std::fs::write(&path, b"MATLAB").unwrap();
        assert!(matches!(
            ModelLoader::load(&OnDisk, &path),
            Err(ModelLoaderError::Source(message)) if message == "6 bytes of unknown format"
        ));
    }
}
