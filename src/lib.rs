//! # MRI scan simulator core
//!
//! This crate holds the parts of an educational MRI scanner simulator that
//! do not depend on a GUI: planning where to scan, and synthesizing the
//! images such a scan would produce from a voxel model of tissue
//! properties.
//!
//! Planning revolves around a [`ScanVolume`], an oriented box inside the
//! scanner bore described by its centre, three stored rotation angles
//! (RL, AP, FH) and its extents. It is subdivided into slices. The volume
//! can be shown on any number of 2D images at once:
//!  - Axial
//!  - Sagittal
//!  - Coronal
//!
//! Each view sees the outline of the volume, its middle slice and every
//! slice cut by the image plane. Dragging in a view moves, turns or resizes
//! the shared volume through a [`ScanVolumeBus`], which keeps all other
//! views in step.
//!
//! Acquisition evaluates a pulse-sequence signal equation over the whole
//! tissue model and resamples the result onto the plane of every planned
//! slice, so arbitrarily oblique slices can be cut out of an axis-aligned
//! model. Resampling uses rayon where available.
//!
//! Conventions:
//!   - Patient coordinates are LPS millimetres, relaxation times are
//!     milliseconds
//!   - Model arrays are indexed `[x, y, z]` with voxel centres symmetric
//!     about the isocentre
//!   - An image's `origin_lps` is the centre of its first pixel, ready to be
//!     written as DICOM ImagePositionPatient
//!
//! # Roadmap
//!
//!  - Gradient echo signal equation
//!  - Export of acquired series
//!
//! # Examples
//!
//! ## Planning and acquiring an axial scan
//!
//! Build a uniform phantom, plan three axial slices on it and acquire them
//! with a spin echo sequence.
//!
//! ```
//! # use mri_scan_sim::{AppContext, Config, ScanParameters, Session, TissueModel};
//! let model = TissueModel::uniform((16, 16, 16), [2.0; 3], 1.0, 800.0, 80.0, 40.0)
//!     .expect("should have built a phantom");
//! let mut session = Session::new(AppContext::new(Config::default()), model);
//! let parameters = ScanParameters {
//!     n_slices: 3,
//!     slice_thickness_mm: 4.0,
//!     fov_mm: [32.0, 32.0],
//!     matrix: [16, 16],
//!     ..ScanParameters::default()
//! };
//! let item = session
//!     .add_scan_item("T1 axial", parameters)
//!     .expect("should have planned the scan");
//! let series = session.scan(item).expect("should have acquired the series");
//! assert_eq!(series.images.len(), 3);
//! ```

pub mod acquisition;
pub mod config;
pub mod enums;
pub mod geometry;
pub mod image_geometry;
mod interpolator;
pub mod intersection;
pub mod model_loader;
pub mod parameters;
pub mod scan_item;
pub mod scan_volume;
pub mod session;
pub mod signal;
pub mod tissue_model;
pub mod viewport;

pub use acquisition::{AcquiredImage, AcquiredSeries, ColorScale, Scanner};
pub use config::Config;
pub use enums::{Interpolation, RotationAxis, ScanPlane, ScanStatus};
pub use image_geometry::ImageGeometry;
pub use parameters::ScanParameters;
pub use scan_item::ScanItem;
pub use scan_volume::{ScanVolume, SliceLayout};
pub use session::{AppContext, Session};
pub use tissue_model::TissueModel;
pub use viewport::{ScanVolumeBus, Viewport};
