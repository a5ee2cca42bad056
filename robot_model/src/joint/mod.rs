pub mod joint_transform;

pub use joint_transform::JointTransform;

use crate::{Id, RobotModelErrors};
use nalgebra::{Matrix3, Vector3, Vector6};
use serde::{Deserialize, Serialize};
use spatial_algebra::{MotionVector, Origin, rotation_x, rotation_y, rotation_z};
use tolerance::NoiseTolerance;

/// Coordinate axis a single degree of freedom joint moves along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Only unit axes aligned with a coordinate direction are supported.
    pub fn from_xyz(xyz: [f64; 3]) -> Result<Self, RobotModelErrors> {
        let unsupported = || {
            RobotModelErrors::UnsupportedJointType(format!(
                "axis {xyz:?} is not one of [1 0 0], [0 1 0], [0 0 1]"
            ))
        };
        let mut nonzero = xyz.iter().enumerate().filter(|(_, v)| **v != 0.0);
        let (index, value) = nonzero.next().ok_or_else(unsupported)?;
        if nonzero.next().is_some() || *value != 1.0 {
            return Err(unsupported());
        }
        Ok(match index {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        })
    }

    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn unit(self) -> Vector3<f64> {
        let mut v = Vector3::zeros();
        v[self.index()] = 1.0;
        v
    }

    /// Coordinate rotation by `theta` about this axis.
    pub fn rotation(self, theta: f64) -> Matrix3<f64> {
        match self {
            Axis::X => rotation_x(theta),
            Axis::Y => rotation_y(theta),
            Axis::Z => rotation_z(theta),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointType {
    Revolute(Axis),
    Prismatic(Axis),
    Fixed,
}

impl JointType {
    /// URDF leaves the axis optional and defaults it to x.
    pub const DEFAULT_AXIS: [f64; 3] = [1.0, 0.0, 0.0];

    pub fn parse(type_name: &str, axis: Option<[f64; 3]>) -> Result<Self, RobotModelErrors> {
        let parse_axis = || Axis::from_xyz(axis.unwrap_or(Self::DEFAULT_AXIS));
        match type_name {
            "revolute" => Ok(JointType::Revolute(parse_axis()?)),
            "prismatic" => Ok(JointType::Prismatic(parse_axis()?)),
            "fixed" => Ok(JointType::Fixed),
            other => Err(RobotModelErrors::UnsupportedJointType(format!(
                "'{other}', only revolute, prismatic and fixed joints are supported"
            ))),
        }
    }

    pub fn ndof(&self) -> usize {
        match self {
            JointType::Revolute(_) | JointType::Prismatic(_) => 1,
            JointType::Fixed => 0,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, JointType::Fixed)
    }

    /// S, a single unit entry: rotational slots 0..3, translational slots 3..6
    pub fn motion_subspace(&self) -> MotionVector {
        let mut s = Vector6::zeros();
        match self {
            JointType::Revolute(axis) => s[axis.index()] = 1.0,
            JointType::Prismatic(axis) => s[3 + axis.index()] = 1.0,
            JointType::Fixed => {}
        }
        MotionVector::from(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    name: String,
    joint_type: JointType,
    origin: Origin,
    damping: f64,
    parent: String,
    child: String,
    transform: JointTransform,
    urdf_id: usize,
    id: Id,
    bfs_id: Id,
    bfs_level: i32,
}

impl Joint {
    /// `urdf_id` is the position in the description, it doubles as the
    /// temporary id until the model is renumbered.
    pub fn new(
        name: &str,
        urdf_id: usize,
        parent: &str,
        child: &str,
        joint_type: JointType,
        origin: Origin,
        tolerance: &NoiseTolerance,
    ) -> Self {
        Self {
            name: name.to_string(),
            joint_type,
            origin,
            damping: 0.0,
            parent: parent.to_string(),
            child: child.to_string(),
            transform: JointTransform::new(joint_type, &origin, tolerance),
            urdf_id,
            id: Id::new(urdf_id),
            bfs_id: Id::new(urdf_id),
            bfs_level: 0,
        }
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joint_type(&self) -> JointType {
        self.joint_type
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// parent link name
    pub fn parent(&self) -> &str {
        &self.parent
    }

    /// child link name
    pub fn child(&self) -> &str {
        &self.child
    }

    pub fn transform(&self) -> &JointTransform {
        &self.transform
    }

    pub fn motion_subspace(&self) -> MotionVector {
        self.joint_type.motion_subspace()
    }

    pub fn urdf_id(&self) -> usize {
        self.urdf_id
    }

    /// canonical depth first id
    pub fn id(&self) -> Id {
        self.id
    }

    pub fn bfs_id(&self) -> Id {
        self.bfs_id
    }

    pub fn bfs_level(&self) -> i32 {
        self.bfs_level
    }

    pub(crate) fn set_parent(&mut self, parent: &str) {
        self.parent = parent.to_string();
    }

    pub(crate) fn transform_mut(&mut self) -> &mut JointTransform {
        &mut self.transform
    }

    pub(crate) fn set_id(&mut self, id: Id) {
        self.id = id;
    }

    pub(crate) fn set_bfs(&mut self, bfs_id: Id, bfs_level: i32) {
        self.bfs_id = bfs_id;
        self.bfs_level = bfs_level;
    }
}
