use ndarray::Array3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TissueModelError {
    #[error("Tissue maps have inconsistent dimensions")]
    InconsistentDimensions,

    #[error("Voxel spacing must be positive, got {0:?}")]
    InvalidSpacing([f64; 3]),

    #[error("Tissue maps contain no voxels")]
    Empty,
}

/// Volumetric tissue properties the images are synthesised from.
///
/// Arrays are indexed `[x, y, z]` along the LPS axes. Relaxation times are in
/// milliseconds and the spacing is in millimetres. Voxel centres are laid out
/// symmetrically about the isocentre.
#[derive(Clone, Debug)]
pub struct TissueModel {
    t1: Array3<f64>,
    t2: Array3<f64>,
    t2_star: Array3<f64>,
    pd: Array3<f64>,
    spacing: [f64; 3],
}

impl TissueModel {
    pub fn new(
        t1: Array3<f64>,
        t2: Array3<f64>,
        t2_star: Array3<f64>,
        pd: Array3<f64>,
        spacing: [f64; 3],
    ) -> Result<Self, TissueModelError> {
        let dim = t1.dim();
        if [t2.dim(), t2_star.dim(), pd.dim()].iter().any(|d| *d != dim) {
            return Err(TissueModelError::InconsistentDimensions);
        }
        if t1.is_empty() {
            return Err(TissueModelError::Empty);
        }
        if spacing.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(TissueModelError::InvalidSpacing(spacing));
        }
        Ok(Self {
            t1,
            t2,
            t2_star,
            pd,
            spacing,
        })
    }

    /// A model with the same tissue in every voxel.
    pub fn uniform(
        dim: (usize, usize, usize),
        spacing: [f64; 3],
        pd: f64,
        t1: f64,
        t2: f64,
        t2_star: f64,
    ) -> Result<Self, TissueModelError> {
        Self::new(
            Array3::from_elem(dim, t1),
            Array3::from_elem(dim, t2),
            Array3::from_elem(dim, t2_star),
            Array3::from_elem(dim, pd),
            spacing,
        )
    }

    /// Number of voxels along (x, y, z)
    pub fn dim(&self) -> (usize, usize, usize) {
        self.t1.dim()
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// Physical size of the model along (x, y, z) in mm
    pub fn extent_mm(&self) -> [f64; 3] {
        let (nx, ny, nz) = self.dim();
        [
            nx as f64 * self.spacing[0],
            ny as f64 * self.spacing[1],
            nz as f64 * self.spacing[2],
        ]
    }

    /// Coordinate of the first voxel centre along `axis`
    pub fn first_centre(&self, axis: usize) -> f64 {
        let n = [self.dim().0, self.dim().1, self.dim().2][axis];
        -((n as f64 - 1.0) / 2.0) * self.spacing[axis]
    }

    /// Coordinates of the voxel centres along one axis, centred on zero.
    pub fn axis_coordinates(&self, axis: usize) -> Vec<f64> {
        let n = [self.dim().0, self.dim().1, self.dim().2][axis];
        let first = self.first_centre(axis);
        (0..n)
            .map(|i| first + i as f64 * self.spacing[axis])
            .collect()
    }

    pub fn t1(&self) -> &Array3<f64> {
        &self.t1
    }

    pub fn t2(&self) -> &Array3<f64> {
        &self.t2
    }

    pub fn t2_star(&self) -> &Array3<f64> {
        &self.t2_star
    }

    pub fn pd(&self) -> &Array3<f64> {
        &self.pd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_eq::assert_float_eq;

    #[test]
    fn mismatched_maps_are_rejected() {
        let result = TissueModel::new(
            Array3::zeros((2, 2, 2)),
            Array3::zeros((2, 2, 2)),
            Array3::zeros((2, 2, 3)),
            Array3::zeros((2, 2, 2)),
            [1.0, 1.0, 1.0],
        );
        assert_eq!(result.unwrap_err(), TissueModelError::InconsistentDimensions);
    }

    #[test]
    fn non_positive_spacing_is_rejected() {
        let result = TissueModel::uniform((2, 2, 2), [1.0, 0.0, 1.0], 1.0, 1.0, 1.0, 1.0);
        assert_eq!(
            result.unwrap_err(),
            TissueModelError::InvalidSpacing([1.0, 0.0, 1.0])
        );
    }

    #[test]
    fn empty_maps_are_rejected() {
        let result = TissueModel::uniform((0, 2, 2), [1.0; 3], 1.0, 1.0, 1.0, 1.0);
        assert_eq!(result.unwrap_err(), TissueModelError::Empty);
    }

    #[test]
    fn voxel_centres_are_symmetric_about_zero() {
        let model = TissueModel::uniform((4, 3, 1), [2.0, 1.5, 5.0], 1.0, 1.0, 1.0, 1.0).unwrap();
        for (x, expected) in model.axis_coordinates(0).iter().zip([-3.0, -1.0, 1.0, 3.0]) {
            assert_float_eq!(*x, expected, abs <= 1e-12);
        }
        for (y, expected) in model.axis_coordinates(1).iter().zip([-1.5, 0.0, 1.5]) {
            assert_float_eq!(*y, expected, abs <= 1e-12);
        }
        assert_eq!(model.axis_coordinates(2), vec![0.0]);
        assert_eq!(model.extent_mm(), [8.0, 4.5, 5.0]);
    }

    #[test]
    fn first_centre_starts_the_coordinate_list() {
        let model = TissueModel::uniform((4, 3, 1), [2.0, 1.5, 5.0], 1.0, 1.0, 1.0, 1.0).unwrap();
        assert_float_eq!(
            [model.first_centre(0), model.first_centre(1), model.first_centre(2)],
            [-3.0, -1.5, 0.0],
            abs_all <= 1e-12
        );
        for axis in 0..3 {
            assert_eq!(model.axis_coordinates(axis)[0], model.first_centre(axis));
        }
    }
}
