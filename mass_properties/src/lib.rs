use nalgebra::{Matrix3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MassPropertiesErrors {
    #[error("mass cannot be less than zero, got {0}")]
    NegativeMass(f64),
    #[error("mass properties must be finite")]
    NotFinite,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CenterOfMass {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CenterOfMass {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }
}

impl From<Vector3<f64>> for CenterOfMass {
    fn from(v: Vector3<f64>) -> CenterOfMass {
        CenterOfMass::new(v[0], v[1], v[2])
    }
}

/// Rotational inertia about a link's own frame, stored as the six unique
/// entries of the symmetric tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InertiaSet {
    pub ixx: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyy: f64,
    pub iyz: f64,
    pub izz: f64,
}

impl InertiaSet {
    /// Argument order follows the URDF `<inertia>` attribute order.
    pub fn new(ixx: f64, ixy: f64, ixz: f64, iyy: f64, iyz: f64, izz: f64) -> Self {
        Self {
            ixx,
            ixy,
            ixz,
            iyy,
            iyz,
            izz,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// [ixx, ixy, ixz, iyy, iyz, izz]
    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(self.ixx, self.ixy, self.ixz, self.iyy, self.iyz, self.izz)
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.ixx, self.ixy, self.ixz, //
            self.ixy, self.iyy, self.iyz, //
            self.ixz, self.iyz, self.izz,
        )
    }

    /// Exact comparison, used to recognize the massless world base frame.
    pub fn is_zero(&self) -> bool {
        self.to_vector().iter().all(|v| *v == 0.0)
    }
}

impl From<Matrix3<f64>> for InertiaSet {
    /// Takes the upper triangle, the matrix is assumed symmetric.
    fn from(m: Matrix3<f64>) -> InertiaSet {
        InertiaSet::new(
            m[(0, 0)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 1)],
            m[(1, 2)],
            m[(2, 2)],
        )
    }
}

/// Represents the mass properties of an object
/// Mass, Center of Mass, Inertia
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub center_of_mass: CenterOfMass,
    pub mass: f64,
    pub inertia: InertiaSet,
}

impl MassProperties {
    pub fn new(
        mass: f64,
        center_of_mass: CenterOfMass,
        inertia: InertiaSet,
    ) -> Result<Self, MassPropertiesErrors> {
        let all_finite = mass.is_finite()
            && center_of_mass.vector().iter().all(|v| v.is_finite())
            && inertia.to_vector().iter().all(|v| v.is_finite());
        if !all_finite {
            return Err(MassPropertiesErrors::NotFinite);
        }
        if mass < 0.0 {
            return Err(MassPropertiesErrors::NegativeMass(mass));
        }
        Ok(MassProperties {
            mass,
            center_of_mass,
            inertia,
        })
    }

    /// The massless, inertia-less properties of a fixed world frame.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.mass == 0.0 && self.inertia.is_zero()
    }
}
