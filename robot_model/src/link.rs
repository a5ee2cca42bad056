use crate::{Id, RobotModelErrors};
use mass_properties::{CenterOfMass, InertiaSet, MassProperties};
use serde::{Deserialize, Serialize};
use spatial_algebra::{Origin, SpatialInertia};
use tolerance::NoiseTolerance;

/// Collects the pieces of a link. Origin and inertial properties are both
/// required before the spatial inertia can be formed.
#[derive(Clone, Debug)]
pub struct LinkBuilder {
    name: String,
    origin: Option<Origin>,
    mass: Option<f64>,
    inertia: Option<InertiaSet>,
}

impl LinkBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            origin: None,
            mass: None,
            inertia: None,
        }
    }

    pub fn set_origin(&mut self, origin: Origin) {
        self.origin = Some(origin);
    }

    pub fn set_inertial(&mut self, mass: f64, inertia: InertiaSet) {
        self.mass = Some(mass);
        self.inertia = Some(inertia);
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.set_origin(origin);
        self
    }

    pub fn with_inertial(mut self, mass: f64, inertia: InertiaSet) -> Self {
        self.set_inertial(mass, inertia);
        self
    }

    /// The center of mass is taken to be the origin translation, the origin
    /// rotation does not rotate the inertia set.
    pub fn build(
        self,
        urdf_id: usize,
        tolerance: &NoiseTolerance,
    ) -> Result<Link, RobotModelErrors> {
        let (Some(origin), Some(mass), Some(inertia)) = (self.origin, self.mass, self.inertia)
        else {
            return Err(RobotModelErrors::IncompleteLinkDefinition(self.name));
        };
        let mass_properties =
            MassProperties::new(mass, CenterOfMass::from(*origin.translation()), inertia)?;
        let spatial_inertia = SpatialInertia::from(&mass_properties).snapped(tolerance);
        Ok(Link {
            name: self.name,
            origin,
            mass_properties,
            spatial_inertia,
            parent_id: Id::ROOT,
            subtree: Vec::new(),
            urdf_id,
            id: Id::new(urdf_id),
            bfs_id: Id::new(urdf_id),
            bfs_level: 0,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    name: String,
    origin: Origin,
    mass_properties: MassProperties,
    spatial_inertia: SpatialInertia,
    parent_id: Id,
    subtree: Vec<Id>,
    urdf_id: usize,
    id: Id,
    bfs_id: Id,
    bfs_level: i32,
}

impl Link {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// As declared, before any fixed children were folded in.
    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    /// Includes the inertia of any links folded into this one.
    pub fn spatial_inertia(&self) -> &SpatialInertia {
        &self.spatial_inertia
    }

    /// id of the link on the parent side of the joint ending here
    pub fn parent_id(&self) -> Id {
        self.parent_id
    }

    /// Ids of this link and every link below it, ascending.
    pub fn subtree(&self) -> &[Id] {
        &self.subtree
    }

    pub fn urdf_id(&self) -> usize {
        self.urdf_id
    }

    pub fn id(&self) -> Id {
        self.id
    }

    pub fn bfs_id(&self) -> Id {
        self.bfs_id
    }

    pub fn bfs_level(&self) -> i32 {
        self.bfs_level
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }

    /// Judged on the folded inertia, not the declared mass properties.
    pub fn is_world_base_frame(&self) -> bool {
        self.spatial_inertia.is_zero()
    }

    pub(crate) fn add_inertia(&mut self, inertia: SpatialInertia, tolerance: &NoiseTolerance) {
        self.spatial_inertia = (self.spatial_inertia + inertia).snapped(tolerance);
    }

    pub(crate) fn set_id(&mut self, id: Id, parent_id: Id) {
        self.id = id;
        self.parent_id = parent_id;
    }

    pub(crate) fn set_bfs(&mut self, bfs_id: Id, bfs_level: i32) {
        self.bfs_id = bfs_id;
        self.bfs_level = bfs_level;
    }

    pub(crate) fn set_subtree(&mut self, subtree: Vec<Id>) {
        self.subtree = subtree;
    }
}
