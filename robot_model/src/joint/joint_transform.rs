use super::JointType;
use nalgebra::Matrix6;
use serde::{Deserialize, Serialize};
use spatial_algebra::{Origin, SpatialTransform, rotation_transform, skew, translation_transform};
use tolerance::NoiseTolerance;

/// Child from parent transform across a joint, X(q) = Xfree(q) * Xfixed.
///
/// Xfixed starts out as the joint origin and picks up the transforms of any
/// fixed joints folded in above it. Xfree only depends on the joint variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointTransform {
    joint_type: JointType,
    fixed: SpatialTransform,
}

impl JointTransform {
    pub fn new(joint_type: JointType, origin: &Origin, tolerance: &NoiseTolerance) -> Self {
        Self {
            joint_type,
            fixed: origin.fixed_transform().snapped(tolerance),
        }
    }

    /// The part of the transform fixed by the model structure.
    pub fn fixed(&self) -> &SpatialTransform {
        &self.fixed
    }

    pub fn free(&self, q: f64) -> SpatialTransform {
        match self.joint_type {
            JointType::Revolute(axis) => SpatialTransform(rotation_transform(&axis.rotation(q))),
            JointType::Prismatic(axis) => {
                let d = axis.unit() * q;
                SpatialTransform(translation_transform(&skew(d[0], d[1], d[2])))
            }
            JointType::Fixed => SpatialTransform::identity(),
        }
    }

    pub fn transform(&self, q: f64) -> SpatialTransform {
        self.free(q) * self.fixed
    }

    pub fn matrix(&self, q: f64) -> Matrix6<f64> {
        self.transform(q).0
    }

    /// Appends a transform on the parent side, new Xfixed = Xfixed * x
    pub(crate) fn compose_fixed(&mut self, x: &SpatialTransform, tolerance: &NoiseTolerance) {
        self.fixed = (self.fixed * *x).snapped(tolerance);
    }
}
