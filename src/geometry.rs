//! Rotation conventions shared by scan volumes and viewers
//!
//! A volume orientation is always derived from three stored angles as
//! `R = R_FH · R_AP · R_RL`, where `R_RL`, `R_AP` and `R_FH` turn about the
//! LPS x, y and z axes respectively. The columns of `R` are the volume's local
//! axes expressed in LPS.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Matrix3, Rotation3, Vector3};

use crate::enums::RotationAxis;

pub type Point2 = nalgebra::Point2<f64>;
pub type Point3 = nalgebra::Point3<f64>;
pub type Vector2 = nalgebra::Vector2<f64>;
pub type Vector3f = Vector3<f64>;
pub type Matrix3f = Matrix3<f64>;

/// `cos(AP)` below which the decomposition treats the matrix as gimbal locked.
const GIMBAL_LOCK_TOLERANCE: f64 = 1e-8;

/// The three stored rotation angles of a scan volume, in radians.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotations {
    pub rl: f64,
    pub ap: f64,
    pub fh: f64,
}

impl Rotations {
    pub fn new(rl: f64, ap: f64, fh: f64) -> Self {
        Self { rl, ap, fh }
    }

    pub fn from_degrees(rl: f64, ap: f64, fh: f64) -> Self {
        Self::new(rl.to_radians(), ap.to_radians(), fh.to_radians())
    }

    pub fn get(&self, axis: RotationAxis) -> f64 {
        match axis {
            RotationAxis::RL => self.rl,
            RotationAxis::AP => self.ap,
            RotationAxis::FH => self.fh,
        }
    }

    pub fn get_mut(&mut self, axis: RotationAxis) -> &mut f64 {
        match axis {
            RotationAxis::RL => &mut self.rl,
            RotationAxis::AP => &mut self.ap,
            RotationAxis::FH => &mut self.fh,
        }
    }

    /// Combined orientation `R_FH · R_AP · R_RL`
    pub fn orientation(&self) -> Matrix3f {
        rotation_matrix(RotationAxis::FH, self.fh)
            * rotation_matrix(RotationAxis::AP, self.ap)
            * rotation_matrix(RotationAxis::RL, self.rl)
    }

    /// Recover angles from an orientation matrix.
    ///
    /// Near gimbal lock (AP ≈ ±90°) only the difference or sum of RL and FH is
    /// determined; FH is then held at `fh_hint` and RL absorbs the rest.
    pub fn from_orientation(m: &Matrix3f, fh_hint: f64) -> Self {
        let cos_ap = (m[(0, 0)] * m[(0, 0)] + m[(1, 0)] * m[(1, 0)]).sqrt();
        if cos_ap > GIMBAL_LOCK_TOLERANCE {
            let ap = (-m[(2, 0)]).atan2(cos_ap);
            let rl = m[(2, 1)].atan2(m[(2, 2)]);
            let fh = m[(1, 0)].atan2(m[(0, 0)]);
            return Self { rl, ap, fh };
        }

        let fh = fh_hint;
        if m[(2, 0)] <= 0.0 {
            Self {
                rl: fh + m[(0, 1)].atan2(m[(1, 1)]),
                ap: FRAC_PI_2,
                fh,
            }
        } else {
            Self {
                rl: (-m[(0, 1)]).atan2(m[(1, 1)]) - fh,
                ap: -FRAC_PI_2,
                fh,
            }
        }
    }

    pub fn to_degrees(&self) -> [f64; 3] {
        [self.rl.to_degrees(), self.ap.to_degrees(), self.fh.to_degrees()]
    }
}

/// Right-handed rotation by `angle` about one LPS axis.
pub fn rotation_matrix(axis: RotationAxis, angle: f64) -> Matrix3f {
    let unit = match axis {
        RotationAxis::RL => Vector3::x_axis(),
        RotationAxis::AP => Vector3::y_axis(),
        RotationAxis::FH => Vector3::z_axis(),
    };
    Rotation3::from_axis_angle(&unit, angle).into_inner()
}

/// Map an angle onto (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let wrapped = angle.sin().atan2(angle.cos());
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}
