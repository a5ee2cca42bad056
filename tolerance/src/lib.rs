use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Tolerances used to strip floating point noise out of composed transforms.
///
/// Description files routinely carry angles like 3.14 or 1.5708 that are meant
/// to be exact multiples of pi, and products of sines and cosines leave 1e-17
/// residue where an exact zero belongs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseTolerance {
    /// entries with magnitude below this become exactly 0.0
    pub zero_tolerance: f64,
    /// entries within this of +1 or -1 become exactly +1 or -1
    pub unit_tolerance: f64,
    /// angles within this of k*pi/pi_divisions are snapped, None disables
    pub angle_tolerance: Option<f64>,
    pub pi_divisions: u32,
}

impl Default for NoiseTolerance {
    fn default() -> Self {
        Self {
            zero_tolerance: 1e-10,
            unit_tolerance: 1e-10,
            angle_tolerance: Some(1e-6),
            pi_divisions: 12,
        }
    }
}

impl NoiseTolerance {
    /// No snapping at all, values pass through untouched.
    pub fn exact() -> Self {
        Self {
            zero_tolerance: 0.0,
            unit_tolerance: 0.0,
            angle_tolerance: None,
            pi_divisions: 12,
        }
    }

    pub fn with_angle_tolerance(mut self, angle_tolerance: Option<f64>) -> Self {
        self.angle_tolerance = angle_tolerance;
        self
    }

    pub fn with_zero_tolerance(mut self, zero_tolerance: f64) -> Self {
        self.zero_tolerance = zero_tolerance;
        self
    }

    /// Snaps a single matrix entry to 0 or +-1 if it is within tolerance.
    pub fn snap_value(&self, value: f64) -> f64 {
        if value.abs() < self.zero_tolerance {
            0.0
        } else if (value.abs() - 1.0).abs() < self.unit_tolerance {
            value.signum()
        } else {
            value
        }
    }

    /// Snaps an angle to the nearest rational multiple of pi, k*pi/pi_divisions.
    pub fn snap_angle(&self, angle: f64) -> f64 {
        let Some(tol) = self.angle_tolerance else {
            return angle;
        };
        if self.pi_divisions == 0 {
            return angle;
        }
        let divisions = f64::from(self.pi_divisions);
        let k = (angle * divisions / PI).round();
        let candidate = k * PI / divisions;
        if (angle - candidate).abs() <= tol {
            candidate
        } else {
            angle
        }
    }

    pub fn snap_angles<const D: usize>(&self, angles: SVector<f64, D>) -> SVector<f64, D> {
        angles.map(|a| self.snap_angle(a))
    }

    pub fn snap_matrix<const R: usize, const C: usize>(
        &self,
        matrix: SMatrix<f64, R, C>,
    ) -> SMatrix<f64, R, C> {
        matrix.map(|v| self.snap_value(v))
    }
}
