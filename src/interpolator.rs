use ndarray::{Array2, Array3, ArrayView3, ShapeError};
use rayon::prelude::*;

use crate::enums::Interpolation;
use crate::geometry::Point3;
use crate::image_geometry::ImageGeometry;
use crate::tissue_model::TissueModel;

/// Samples closer than this (in voxels) outside the grid are pulled onto it.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Samples a voxel array laid out on the model's grid at arbitrary LPS points.
/// Points outside the grid of voxel centres read as zero.
pub(crate) struct Interpolator<'a> {
    data: ArrayView3<'a, f64>,
    first_centre: [f64; 3],
    spacing: [f64; 3],
    method: Interpolation,
}

impl<'a> Interpolator<'a> {
    pub(crate) fn new(data: &'a Array3<f64>, model: &TissueModel, method: Interpolation) -> Self {
        let first_centre = [0, 1, 2].map(|axis| model.first_centre(axis));
        Self {
            data: data.view(),
            first_centre,
            spacing: model.spacing(),
            method,
        }
    }

    /// Fractional voxel index of `point`, or `None` outside the grid
    #[inline]
    fn continuous_index(&self, point: &Point3) -> Option<[f64; 3]> {
        let (nx, ny, nz) = self.data.dim();
        let n = [nx, ny, nz];
        let mut index = [0.0; 3];
        for axis in 0..3 {
            let f = (point[axis] - self.first_centre[axis]) / self.spacing[axis];
            let last = (n[axis] - 1) as f64;
            if f < -EDGE_TOLERANCE || f > last + EDGE_TOLERANCE {
                return None;
            }
            index[axis] = f.clamp(0.0, last);
        }
        Some(index)
    }

    #[inline]
    pub(crate) fn sample(&self, point: &Point3) -> f64 {
        match self.continuous_index(point) {
            None => 0.0,
            Some(index) => match self.method {
                Interpolation::Linear => self.trilinear_interpolate(index),
                Interpolation::Nearest => self.data[index.map(|i| i.round() as usize)],
            },
        }
    }

    #[inline]
    fn trilinear_interpolate(&self, [x, y, z]: [f64; 3]) -> f64 {
        let (nx, ny, nz) = self.data.dim();

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let z0 = z.floor() as usize;
        let x1 = (x0 + 1).min(nx - 1);
        let y1 = (y0 + 1).min(ny - 1);
        let z1 = (z0 + 1).min(nz - 1);

        let dx = x - x0 as f64;
        let dy = y - y0 as f64;
        let dz = z - z0 as f64;

        let lerp = |a: f64, b: f64, t: f64| if t == 0.0 { a } else { a.mul_add(1.0 - t, b * t) };
        let d = &self.data;

        let v00 = lerp(d[[x0, y0, z0]], d[[x1, y0, z0]], dx);
        let v10 = lerp(d[[x0, y1, z0]], d[[x1, y1, z0]], dx);
        let v01 = lerp(d[[x0, y0, z1]], d[[x1, y0, z1]], dx);
        let v11 = lerp(d[[x0, y1, z1]], d[[x1, y1, z1]], dx);

        let v0 = lerp(v00, v10, dy);
        let v1 = lerp(v01, v11, dy);

        lerp(v0, v1, dz)
    }

    /// Cut the image described by `geometry` out of the volume, one sample
    /// per pixel centre.
    pub(crate) fn resample_plane(
        &self,
        geometry: &ImageGeometry,
    ) -> Result<Array2<f64>, ShapeError> {
        let (columns, rows) = (geometry.columns(), geometry.rows());
        let pixel_data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map_iter(|row| {
                (0..columns).map(move |column| {
                    let lps = geometry.mm_to_lps(&geometry.pixel_centre_mm(column, row));
                    self.sample(&lps)
                })
            })
            .collect();
        Array2::from_shape_vec((rows, columns), pixel_data)
    }
}
