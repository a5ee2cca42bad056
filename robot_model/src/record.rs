//! Plain records for a parsed robot description.
//!
//! These mirror what an XML parser hands back for a URDF file: elements with
//! string attributes and optional child elements. Nothing here is validated,
//! missing or unparsable values are reported when the model is built.

use crate::RobotModelErrors;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OriginRecord {
    pub xyz: Option<String>,
    pub rpy: Option<String>,
}

impl OriginRecord {
    pub fn new(xyz: &str, rpy: &str) -> Self {
        Self {
            xyz: Some(xyz.to_string()),
            rpy: Some(rpy.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertiaRecord {
    pub ixx: Option<String>,
    pub ixy: Option<String>,
    pub ixz: Option<String>,
    pub iyy: Option<String>,
    pub iyz: Option<String>,
    pub izz: Option<String>,
}

impl InertiaRecord {
    /// values in ixx, ixy, ixz, iyy, iyz, izz order
    pub fn new(values: [&str; 6]) -> Self {
        let [ixx, ixy, ixz, iyy, iyz, izz] = values.map(|v| Some(v.to_string()));
        Self {
            ixx,
            ixy,
            ixz,
            iyy,
            iyz,
            izz,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InertialRecord {
    pub mass: Option<String>,
    pub inertia: Option<InertiaRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkRecord {
    pub name: Option<String>,
    pub origin: Option<OriginRecord>,
    pub inertial: Option<InertialRecord>,
}

impl LinkRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_origin(mut self, xyz: &str, rpy: &str) -> Self {
        self.origin = Some(OriginRecord::new(xyz, rpy));
        self
    }

    pub fn with_inertial(mut self, mass: &str, inertia: [&str; 6]) -> Self {
        self.inertial = Some(InertialRecord {
            mass: Some(mass.to_string()),
            inertia: Some(InertiaRecord::new(inertia)),
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisRecord {
    pub xyz: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsRecord {
    pub damping: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointRecord {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub joint_type: Option<String>,
    pub parent: Option<String>,
    pub child: Option<String>,
    pub origin: Option<OriginRecord>,
    pub axis: Option<AxisRecord>,
    pub dynamics: Option<DynamicsRecord>,
}

impl JointRecord {
    pub fn new(name: &str, joint_type: &str, parent: &str, child: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            joint_type: Some(joint_type.to_string()),
            parent: Some(parent.to_string()),
            child: Some(child.to_string()),
            ..Default::default()
        }
    }

    pub fn with_origin(mut self, xyz: &str, rpy: &str) -> Self {
        self.origin = Some(OriginRecord::new(xyz, rpy));
        self
    }

    pub fn with_axis(mut self, xyz: &str) -> Self {
        self.axis = Some(AxisRecord {
            xyz: Some(xyz.to_string()),
        });
        self
    }

    pub fn with_damping(mut self, damping: &str) -> Self {
        self.dynamics = Some(DynamicsRecord {
            damping: Some(damping.to_string()),
        });
        self
    }
}

/// The root `<robot>` element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotRecord {
    pub name: Option<String>,
    pub links: Vec<LinkRecord>,
    pub joints: Vec<JointRecord>,
}

impl RobotRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_link(mut self, link: LinkRecord) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_joint(mut self, joint: JointRecord) -> Self {
        self.joints.push(joint);
        self
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, RobotModelErrors> {
        Ok(ron::from_str(contents)?)
    }

    pub fn load(path: &Path) -> Result<Self, RobotModelErrors> {
        let contents = fs::read_to_string(path).map_err(|source| RobotModelErrors::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }
}

/// Returns the attribute value or a MalformedInput naming what is missing.
pub(crate) fn required<'a>(
    value: &'a Option<String>,
    what: impl FnOnce() -> String,
) -> Result<&'a str, RobotModelErrors> {
    value
        .as_deref()
        .ok_or_else(|| RobotModelErrors::MalformedInput(format!("missing {}", what())))
}

pub(crate) fn parse_scalar(text: &str, what: &str) -> Result<f64, RobotModelErrors> {
    text.trim().parse::<f64>().map_err(|_| {
        RobotModelErrors::MalformedInput(format!("{what} '{text}' is not a number"))
    })
}

/// Parses a whitespace separated "x y z" attribute.
pub(crate) fn parse_triple(text: &str, what: &str) -> Result<[f64; 3], RobotModelErrors> {
    let values = text
        .split_whitespace()
        .map(|token| parse_scalar(token, what))
        .collect::<Result<Vec<_>, _>>()?;
    <[f64; 3]>::try_from(values).map_err(|values| {
        RobotModelErrors::MalformedInput(format!(
            "{what} '{text}' should have 3 values, found {}",
            values.len()
        ))
    })
}
