pub mod origin;

pub use origin::{Origin, OriginBuilder};

use mass_properties::MassProperties;
use nalgebra::{Matrix3, Matrix6, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul};
use thiserror::Error;
use tolerance::NoiseTolerance;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SpatialAlgebraErrors {
    #[error("origin is missing its {0}, set both translation and rotation first")]
    IncompleteOrigin(&'static str),
    #[error("origin {0} must be finite")]
    NotFinite(&'static str),
}

/// Cross product matrix, skew(v) * u == v x u
pub fn skew(x: f64, y: f64, z: f64) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -z, y, //
        z, 0.0, -x, //
        -y, x, 0.0,
    )
}

/// Featherstone `xlt`: spatial transform for a pure translation, [[1, 0], [-rx, 1]]
pub fn translation_transform(rx: &Matrix3<f64>) -> Matrix6<f64> {
    let mut x = Matrix6::identity();
    x.fixed_view_mut::<3, 3>(3, 0).copy_from(&(-rx));
    x
}

/// Featherstone `rx`, coordinate rotation about x
pub fn rotation_x(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0, //
        0.0, c, s, //
        0.0, -s, c,
    )
}

/// Featherstone `ry`, coordinate rotation about y
pub fn rotation_y(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(
        c, 0.0, -s, //
        0.0, 1.0, 0.0, //
        s, 0.0, c,
    )
}

/// Featherstone `rz`, coordinate rotation about z
pub fn rotation_z(theta: f64) -> Matrix3<f64> {
    let (s, c) = theta.sin_cos();
    Matrix3::new(
        c, s, 0.0, //
        -s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

/// Featherstone `rot`, block diagonal [[E, 0], [0, E]]
pub fn rotation_transform(e: &Matrix3<f64>) -> Matrix6<f64> {
    let mut x = Matrix6::zeros();
    x.fixed_view_mut::<3, 3>(0, 0).copy_from(e);
    x.fixed_view_mut::<3, 3>(3, 3).copy_from(e);
    x
}

/// Coordinate rotation into a frame given by URDF roll-pitch-yaw.
/// rx(r) * ry(p) * rz(y), the transpose of the active Rz(y) * Ry(p) * Rx(r).
pub fn rpy_rotation(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    rotation_x(roll) * rotation_y(pitch) * rotation_z(yaw)
}

/// Spatial motion vector, angular part first. Joint motion subspaces are
/// expressed with this type.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionVector {
    pub rotation: Vector3<f64>,
    pub translation: Vector3<f64>,
}

impl MotionVector {
    pub fn new(rotation: Vector3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.rotation[0],
            self.rotation[1],
            self.rotation[2],
            self.translation[0],
            self.translation[1],
            self.translation[2],
        )
    }

    pub fn is_zero(&self) -> bool {
        self.vector().iter().all(|v| *v == 0.0)
    }
}

impl From<Vector6<f64>> for MotionVector {
    fn from(v: Vector6<f64>) -> Self {
        Self::new(
            Vector3::new(v[0], v[1], v[2]),
            Vector3::new(v[3], v[4], v[5]),
        )
    }
}

/// Plucker transform for motion vectors, B_X_A maps motion in A to motion in B.
/// Always of the form [[E, 0], [-E rx, E]].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialTransform(pub Matrix6<f64>);

impl Default for SpatialTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SpatialTransform {
    pub fn identity() -> Self {
        Self(Matrix6::identity())
    }

    /// rot(E) * xlt(r), rotation applied after the translation of the origin
    pub fn from_rotation_translation(e: &Matrix3<f64>, r: &Vector3<f64>) -> Self {
        Self(rotation_transform(e) * translation_transform(&skew(r[0], r[1], r[2])))
    }

    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.0
    }

    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    pub fn snapped(self, tolerance: &NoiseTolerance) -> Self {
        Self(tolerance.snap_matrix(self.0))
    }

    /// Re-expresses an inertia given in this transform's target frame in its
    /// source frame: X^T I X
    pub fn congruence(&self, inertia: &SpatialInertia) -> SpatialInertia {
        SpatialInertia(self.0.transpose() * inertia.0 * self.0)
    }
}

impl Mul<SpatialTransform> for SpatialTransform {
    type Output = SpatialTransform;
    #[inline]
    fn mul(self, rhs: SpatialTransform) -> SpatialTransform {
        SpatialTransform(self.0 * rhs.0)
    }
}

/// 6x6 rigid body inertia. Starts out built from mass properties but after
/// bodies are merged it is just the summed matrix.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpatialInertia(pub Matrix6<f64>);

impl Default for SpatialInertia {
    fn default() -> Self {
        Self::zero()
    }
}

impl SpatialInertia {
    pub fn zero() -> Self {
        Self(Matrix6::zeros())
    }

    pub fn matrix(&self) -> &Matrix6<f64> {
        &self.0
    }

    pub fn mass(&self) -> f64 {
        self.0[(5, 5)]
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }

    pub fn snapped(self, tolerance: &NoiseTolerance) -> Self {
        Self(tolerance.snap_matrix(self.0))
    }
}

impl From<&MassProperties> for SpatialInertia {
    /// [[I + m c c^T, m c], [m c^T, m 1]] with c the skew of the center of mass
    fn from(mp: &MassProperties) -> SpatialInertia {
        let mass = mp.mass;
        let com = mp.center_of_mass.vector();
        let cx = skew(com[0], com[1], com[2]);
        let cxt = cx.transpose();

        let quad11 = mp.inertia.matrix() + cx * cxt * mass;
        let quad12 = cx * mass;
        let quad21 = cxt * mass;
        let quad22 = Matrix3::identity() * mass;

        let mut m = Matrix6::zeros();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&quad11);
        m.fixed_view_mut::<3, 3>(0, 3).copy_from(&quad12);
        m.fixed_view_mut::<3, 3>(3, 0).copy_from(&quad21);
        m.fixed_view_mut::<3, 3>(3, 3).copy_from(&quad22);
        SpatialInertia(m)
    }
}

impl Add<SpatialInertia> for SpatialInertia {
    type Output = SpatialInertia;
    fn add(self, rhs: SpatialInertia) -> SpatialInertia {
        SpatialInertia(self.0 + rhs.0)
    }
}
