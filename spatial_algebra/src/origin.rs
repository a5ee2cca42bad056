use crate::{SpatialAlgebraErrors, SpatialTransform, rpy_rotation};
use nalgebra::{Matrix3, Matrix4, Vector3};
use serde::{Deserialize, Serialize};
use tolerance::NoiseTolerance;

/// Collects the translation and rotation of a pose. Both have to be set
/// before an [`Origin`] can be built.
#[derive(Clone, Copy, Debug, Default)]
pub struct OriginBuilder {
    translation: Option<Vector3<f64>>,
    rpy: Option<Vector3<f64>>,
}

impl OriginBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_translation(&mut self, x: f64, y: f64, z: f64) {
        self.translation = Some(Vector3::new(x, y, z));
    }

    pub fn set_rotation(&mut self, roll: f64, pitch: f64, yaw: f64) {
        self.rpy = Some(Vector3::new(roll, pitch, yaw));
    }

    pub fn with_translation(mut self, x: f64, y: f64, z: f64) -> Self {
        self.set_translation(x, y, z);
        self
    }

    pub fn with_rotation(mut self, roll: f64, pitch: f64, yaw: f64) -> Self {
        self.set_rotation(roll, pitch, yaw);
        self
    }

    pub fn build(&self, tolerance: &NoiseTolerance) -> Result<Origin, SpatialAlgebraErrors> {
        let translation = self
            .translation
            .ok_or(SpatialAlgebraErrors::IncompleteOrigin("translation"))?;
        let rpy = self
            .rpy
            .ok_or(SpatialAlgebraErrors::IncompleteOrigin("rotation"))?;
        if !translation.iter().all(|v| v.is_finite()) {
            return Err(SpatialAlgebraErrors::NotFinite("translation"));
        }
        if !rpy.iter().all(|v| v.is_finite()) {
            return Err(SpatialAlgebraErrors::NotFinite("rotation"));
        }
        Ok(Origin::compose(translation, rpy, tolerance))
    }
}

/// A fixed rigid pose, translation then roll-pitch-yaw as in a URDF `<origin>`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Origin {
    translation: Vector3<f64>,
    rpy: Vector3<f64>,
    rotation: Matrix3<f64>,
    fixed_transform: SpatialTransform,
    homogeneous: Matrix4<f64>,
    homogeneous_inverse: Matrix4<f64>,
}

impl Default for Origin {
    fn default() -> Self {
        Self::identity()
    }
}

impl Origin {
    pub fn identity() -> Self {
        Self::compose(Vector3::zeros(), Vector3::zeros(), &NoiseTolerance::exact())
    }

    fn compose(translation: Vector3<f64>, rpy: Vector3<f64>, tolerance: &NoiseTolerance) -> Self {
        let rpy = tolerance.snap_angles(rpy);
        let rotation = tolerance.snap_matrix(rpy_rotation(rpy[0], rpy[1], rpy[2]));

        let fixed_transform =
            SpatialTransform::from_rotation_translation(&rotation, &translation).snapped(tolerance);

        let mut e_hom = Matrix4::identity();
        e_hom.fixed_view_mut::<3, 3>(0, 0).copy_from(&rotation);
        let mut t_hom = Matrix4::identity();
        t_hom.fixed_view_mut::<3, 1>(0, 3).copy_from(&translation);
        let mut t_hom_inv = Matrix4::identity();
        t_hom_inv.fixed_view_mut::<3, 1>(0, 3).copy_from(&(-translation));

        let homogeneous = tolerance.snap_matrix(e_hom * t_hom);
        let homogeneous_inverse = tolerance.snap_matrix(t_hom_inv * e_hom.transpose());

        Self {
            translation,
            rpy,
            rotation,
            fixed_transform,
            homogeneous,
            homogeneous_inverse,
        }
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// roll, pitch, yaw after angle snapping
    pub fn rpy(&self) -> &Vector3<f64> {
        &self.rpy
    }

    pub fn rotation(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    /// rot(E) * xlt(translation)
    pub fn fixed_transform(&self) -> &SpatialTransform {
        &self.fixed_transform
    }

    pub fn homogeneous(&self) -> &Matrix4<f64> {
        &self.homogeneous
    }

    pub fn homogeneous_inverse(&self) -> &Matrix4<f64> {
        &self.homogeneous_inverse
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rotation_transform, rotation_z, skew, translation_transform};
    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix6;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_incomplete_origin() {
        let tol = NoiseTolerance::default();
        let missing_rotation = OriginBuilder::new().with_translation(1.0, 2.0, 3.0);
        assert_eq!(
            missing_rotation.build(&tol),
            Err(SpatialAlgebraErrors::IncompleteOrigin("rotation"))
        );
        let missing_translation = OriginBuilder::new().with_rotation(0.0, 0.0, 0.0);
        assert_eq!(
            missing_translation.build(&tol),
            Err(SpatialAlgebraErrors::IncompleteOrigin("translation"))
        );
    }

    #[test]
    fn test_not_finite() {
        let origin = OriginBuilder::new()
            .with_translation(f64::INFINITY, 0.0, 0.0)
            .with_rotation(0.0, 0.0, 0.0);
        assert_eq!(
            origin.build(&NoiseTolerance::default()),
            Err(SpatialAlgebraErrors::NotFinite("translation"))
        );
    }

    #[test]
    fn test_identity() {
        let origin = Origin::identity();
        assert_eq!(*origin.fixed_transform().matrix(), Matrix6::identity());
        assert_eq!(*origin.homogeneous(), Matrix4::identity());
    }

    #[test]
    fn test_fixed_transform_rotation_then_translation() {
        let origin = OriginBuilder::new()
            .with_translation(1.0, 2.0, 3.0)
            .with_rotation(0.0, 0.0, FRAC_PI_2)
            .build(&NoiseTolerance::default())
            .unwrap();
        let expected = rotation_transform(&rotation_z(FRAC_PI_2))
            * translation_transform(&skew(1.0, 2.0, 3.0));
        assert_abs_diff_eq!(*origin.fixed_transform().matrix(), expected, epsilon = 1e-15);
        // cos(pi/2) residue is snapped to exactly zero
        assert_eq!(origin.rotation()[(0, 0)], 0.0);
        assert_eq!(origin.rotation()[(0, 1)], 1.0);
    }

    #[test]
    fn test_near_pi_is_snapped() {
        let origin = OriginBuilder::new()
            .with_translation(0.0, 0.0, 0.0)
            .with_rotation(PI - 2e-7, 0.0, 0.0)
            .build(&NoiseTolerance::default())
            .unwrap();
        let expected = Matrix3::new(1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0);
        assert_eq!(*origin.rotation(), expected);

        let raw = OriginBuilder::new()
            .with_translation(0.0, 0.0, 0.0)
            .with_rotation(PI - 2e-7, 0.0, 0.0)
            .build(&NoiseTolerance::exact())
            .unwrap();
        assert_ne!(*raw.rotation(), expected);
    }

    #[test]
    fn test_homogeneous_inverse() {
        let origin = OriginBuilder::new()
            .with_translation(0.4, -1.0, 2.5)
            .with_rotation(0.3, 0.2, -0.9)
            .build(&NoiseTolerance::default())
            .unwrap();
        assert_abs_diff_eq!(
            origin.homogeneous() * origin.homogeneous_inverse(),
            Matrix4::identity(),
            epsilon = 1e-12
        );
        // the 3x3 block of the homogeneous form is the same rotation as the spatial one
        assert_abs_diff_eq!(
            origin.homogeneous().fixed_view::<3, 3>(0, 0).into_owned(),
            origin.fixed_transform().rotation(),
            epsilon = 1e-15
        );
    }
}
