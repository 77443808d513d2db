use image::{ImageBuffer, Luma};
use ndarray::{Array2, ShapeError};
use rayon::prelude::*;
use thiserror::Error;

use crate::enums::{GeometryError, Interpolation, ScanPlane};
use crate::image_geometry::ImageGeometry;
use crate::interpolator::Interpolator;
use crate::scan_item::ScanItem;
use crate::signal::{SignalCalculatorFactory, SignalError, remove_non_finite};
use crate::tissue_model::TissueModel;

pub type GrayImage = ImageBuffer<Luma<u8>, Vec<u8>>;

#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("Signal synthesis failed: {0}")]
    Signal(#[from] SignalError),

    #[error("Invalid slice geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("Resampled slice has the wrong shape: {0}")]
    Shape(#[from] ShapeError),

    #[error("Scan item {0:?} has no stacks")]
    NoStacks(String),
}

/// Window/level mapping from signal intensity to display grey values.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorScale {
    pub window: f64,
    pub level: f64,
}

impl Default for ColorScale {
    fn default() -> Self {
        Self {
            window: 1.0,
            level: 0.5,
        }
    }
}

impl ColorScale {
    /// Window spanning the full range of `data`.
    pub fn fit(data: &Array2<f64>) -> Self {
        let (min, max) = data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if min > max {
            return Self::default();
        }
        Self {
            window: (max - min).max(f64::EPSILON),
            level: (max + min) / 2.0,
        }
    }

    #[inline]
    pub fn to_u8(&self, value: f64) -> u8 {
        let low = self.level - self.window / 2.0;
        let scaled = (value - low) / self.window.max(f64::EPSILON) * 255.0;
        if scaled.is_nan() {
            return 0;
        }
        scaled.round().clamp(0.0, 255.0) as u8
    }
}

/// One acquired slice and where it lies in the patient.
#[derive(Clone, Debug, PartialEq)]
pub struct AcquiredImage {
    /// Indexed `[row, column]`
    pub data: Array2<f64>,
    pub geometry: ImageGeometry,
}

impl AcquiredImage {
    pub fn to_gray_image(&self, scale: &ColorScale) -> Option<GrayImage> {
        let (height, width) = self.data.dim();
        let pixel_data: Vec<u8> = self
            .data
            .as_standard_layout()
            .as_slice()?
            .par_iter()
            .map(|&v| scale.to_u8(v))
            .collect();
        ImageBuffer::from_raw(width as u32, height as u32, pixel_data)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AcquiredSeries {
    pub name: String,
    pub plane: ScanPlane,
    pub images: Vec<AcquiredImage>,
}

/// Turns a planned scan item into images of a tissue model.
#[derive(Default)]
pub struct Scanner {
    factory: SignalCalculatorFactory,
    interpolation: Interpolation,
}

impl Scanner {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            factory: SignalCalculatorFactory::new(),
            interpolation,
        }
    }

    /// Synthesize the signal of `model` for the item's parameters and cut
    /// every slice of every stack out of it.
    ///
    /// # Errors
    ///
    /// Returns error if the technique is unknown or has no signal equation,
    /// or if the item has no stacks
    pub fn scan(
        &mut self,
        item: &ScanItem,
        model: &TissueModel,
    ) -> Result<AcquiredSeries, AcquisitionError> {
        if item.stacks().is_empty() {
            return Err(AcquisitionError::NoStacks(item.name().to_owned()));
        }
        let parameters = item.parameters();
        log::info!(
            "Scanning {} ({} TE={} TR={} TI={})",
            item.name(),
            parameters.technique,
            parameters.te_ms,
            parameters.tr_ms,
            parameters.ti_ms
        );
        let calculator = self.factory.create_signal_calculator(parameters)?;
        let mut signal = calculator.calculate_signal(parameters, model)?;
        let replaced = remove_non_finite(&mut signal);
        if replaced > 0 {
            log::debug!("Replaced {replaced} non-finite signal values with zero");
        }

        let interpolator = Interpolator::new(&signal, model, self.interpolation);
        let images = item
            .stacks()
            .iter()
            .flat_map(|stack| stack.slice_geometries(parameters.matrix))
            .map(|geometry| {
                let data = interpolator.resample_plane(&geometry)?;
                Ok(AcquiredImage { data, geometry })
            })
            .collect::<Result<Vec<_>, AcquisitionError>>()?;
        log::info!("Acquired {} images for {}", images.len(), item.name());

        Ok(AcquiredSeries {
            name: item.name().to_owned(),
            plane: parameters.scan_plane,
            images,
        })
    }
}
