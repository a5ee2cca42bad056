pub mod builder;
pub mod joint;
pub mod link;
pub mod record;
pub mod robot;

#[cfg(test)]
mod scenarios;

pub use builder::{BuilderOptions, ModelBuilder};
pub use joint::{Axis, Joint, JointTransform, JointType};
pub use link::{Link, LinkBuilder};
pub use record::RobotRecord;
pub use robot::Robot;

use core::fmt;
use mass_properties::MassPropertiesErrors;
use serde::{Deserialize, Serialize};
use spatial_algebra::SpatialAlgebraErrors;
use std::{
    fmt::{Display, Formatter},
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RobotModelErrors {
    #[error("could not read '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("link '{0}' needs an origin and inertial properties before its spatial inertia can be built")]
    IncompleteLinkDefinition(String),
    #[error("links and joints do not form a single tree: {0}")]
    CyclicOrDisconnectedTopology(String),
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("{0}")]
    MassProperties(#[from] MassPropertiesErrors),
    #[error("found more than one root link: {}", .0.join(", "))]
    MultipleRoots(Vec<String>),
    #[error("no root link, every link is the child of some joint")]
    NoRoot,
    #[error("{0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("{0}")]
    RonSerialize(#[from] ron::Error),
    #[error("{0}")]
    SpatialAlgebra(#[from] SpatialAlgebraErrors),
    #[error("unsupported joint type: {0}")]
    UnsupportedJointType(String),
}

/// Position of a link or joint in one of the model orderings.
/// Non-root entities are numbered 0..n-1, the root link is -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(i32);

impl Id {
    pub const ROOT: Id = Id(-1);

    /// None when the index does not fit in 32 bits.
    pub fn checked(index: usize) -> Option<Self> {
        i32::try_from(index).ok().map(Id)
    }

    /// Saturates past i32::MAX. `ModelBuilder::new` rejects descriptions
    /// with more links than that, so built models never hit it.
    pub fn new(index: usize) -> Self {
        Self::checked(index).unwrap_or(Id(i32::MAX))
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// None for the root
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    pub fn is_root(self) -> bool {
        self == Id::ROOT
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id() {
        assert_eq!(Id::ROOT.index(), None);
        assert!(Id::ROOT.is_root());
        assert_eq!(Id::new(3).index(), Some(3));
        assert!(Id::ROOT < Id::new(0));
        assert_eq!(Id::ROOT.to_string(), "-1");
        assert_eq!(Id::checked(7), Some(Id::new(7)));
        assert_eq!(Id::checked(usize::MAX), None);
        assert_eq!(Id::new(usize::MAX), Id(i32::MAX));
    }
}
