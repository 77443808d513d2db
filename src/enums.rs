use serde::Deserialize;
use thiserror::Error;

/// Anatomical label of an image or scan plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScanPlane {
    Axial,
    Sagittal,
    Coronal,
    Oblique,
}

impl ScanPlane {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "axial" | "transversal" => Some(Self::Axial),
            "sagittal" => Some(Self::Sagittal),
            "coronal" => Some(Self::Coronal),
            "oblique" => Some(Self::Oblique),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Axial => "Axial",
            Self::Sagittal => "Sagittal",
            Self::Coronal => "Coronal",
            Self::Oblique => "Oblique",
        }
    }
}

/// Rotation axes in the order the angles are stored: RL (about x), AP (about
/// y), FH (about z).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RotationAxis {
    RL,
    AP,
    FH,
}

impl RotationAxis {
    pub const ALL: [RotationAxis; 3] = [RotationAxis::RL, RotationAxis::AP, RotationAxis::FH];

    /// The axis a viewer of `plane` looks along, i.e. the axis an in-plane
    /// rotation gesture turns about.
    pub fn normal_to(plane: ScanPlane) -> Result<Self, GeometryError> {
        match plane {
            ScanPlane::Axial => Ok(Self::FH),
            ScanPlane::Sagittal => Ok(Self::RL),
            ScanPlane::Coronal => Ok(Self::AP),
            ScanPlane::Oblique => Err(GeometryError::UnknownPlane(plane)),
        }
    }
}

/// Local axes of a scan volume, i.e. the columns of its orientation matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VolumeAxis {
    X,
    Y,
    Z,
}

impl VolumeAxis {
    pub fn index(&self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ScanStatus {
    #[default]
    Ready,
    BeingModified,
    Invalid,
    BeingScanned,
    Complete,
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("plane {0:?} cannot be mapped to an RL/AP/FH axis")]
    UnknownPlane(ScanPlane),
}
