use crate::{
    Id, RobotModelErrors,
    joint::{Joint, JointTransform},
    link::Link,
};
use ron::ser::{PrettyConfig, to_string_pretty};
use serde::{Deserialize, Serialize};
use spatial_algebra::{MotionVector, SpatialInertia};
use std::{
    collections::{BTreeSet, HashMap},
    fs,
    path::Path,
};

/// A canonically numbered kinematic tree.
///
/// Joint `i` connects link `parent_id(i)` to link `i`, and the root link has
/// id -1. Links are stored root first so both vectors are indexed by id.
///
/// Only the links and joints are written out. Loading goes back through the
/// same checks as building, so the name lookups are always rebuilt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredRobot")]
pub struct Robot {
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
    #[serde(skip_serializing)]
    link_names: HashMap<String, usize>,
    #[serde(skip_serializing)]
    joint_names: HashMap<String, usize>,
}

#[derive(Deserialize)]
#[serde(rename = "Robot")]
struct StoredRobot {
    name: String,
    links: Vec<Link>,
    joints: Vec<Joint>,
}

impl TryFrom<StoredRobot> for Robot {
    type Error = RobotModelErrors;

    fn try_from(stored: StoredRobot) -> Result<Self, Self::Error> {
        Robot::from_parts(&stored.name, stored.links, stored.joints)
    }
}

impl Robot {
    pub(crate) fn from_parts(
        name: &str,
        mut links: Vec<Link>,
        mut joints: Vec<Joint>,
    ) -> Result<Self, RobotModelErrors> {
        links.sort_by_key(|link| link.id());
        joints.sort_by_key(|joint| joint.id());
        check_numbering(&links, &joints)?;

        let mut link_names = HashMap::with_capacity(links.len());
        for (index, link) in links.iter().enumerate() {
            if link_names.insert(link.name().to_string(), index).is_some() {
                return Err(RobotModelErrors::MalformedInput(format!(
                    "link name '{}' is used more than once",
                    link.name()
                )));
            }
        }
        let mut joint_names = HashMap::with_capacity(joints.len());
        for (index, joint) in joints.iter().enumerate() {
            if joint_names.insert(joint.name().to_string(), index).is_some() {
                return Err(RobotModelErrors::MalformedInput(format!(
                    "joint name '{}' is used more than once",
                    joint.name()
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            links,
            joints,
            link_names,
            joint_names,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// joints in id order
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// links in id order, starting with the root
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn root(&self) -> Option<&Link> {
        self.links.first()
    }

    pub fn to_ron_string(&self) -> Result<String, RobotModelErrors> {
        Ok(to_string_pretty(self, PrettyConfig::new())?)
    }

    pub fn from_ron_str(contents: &str) -> Result<Self, RobotModelErrors> {
        Ok(ron::from_str(contents)?)
    }

    /// Writes the finished model so it can be loaded without rebuilding.
    pub fn save(&self, path: &Path) -> Result<(), RobotModelErrors> {
        let contents = self.to_ron_string()?;
        fs::write(path, contents).map_err(|source| RobotModelErrors::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    // counts

    pub fn num_joints(&self) -> usize {
        self.joints.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    /// Links excluding the root.
    pub fn num_links_effective(&self) -> usize {
        self.links.len().saturating_sub(1)
    }

    pub fn num_pos(&self) -> usize {
        self.num_joints()
    }

    pub fn num_vel(&self) -> usize {
        self.num_joints()
    }

    pub fn num_cntrl(&self) -> usize {
        self.num_joints()
    }

    // topology

    /// True when every joint hangs off the one numbered just before it.
    pub fn is_serial_chain(&self) -> bool {
        self.links
            .iter()
            .filter(|link| !link.is_root())
            .all(|link| link.id().value() - link.parent_id().value() == 1)
    }

    pub fn parent_id(&self, id: Id) -> Option<Id> {
        self.link_by_id(id).map(Link::parent_id)
    }

    /// Ids that do not name a link are skipped.
    pub fn parent_ids(&self, ids: &[Id]) -> Vec<Id> {
        ids.iter().filter_map(|id| self.parent_id(*id)).collect()
    }

    /// sorted
    pub fn unique_parent_ids(&self, ids: &[Id]) -> Vec<Id> {
        self.parent_ids(ids)
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Parent of every non-root link, in id order.
    pub fn parent_id_array(&self) -> Vec<Id> {
        self.links
            .iter()
            .filter(|link| !link.is_root())
            .map(Link::parent_id)
            .collect()
    }

    pub fn has_repeated_parents(&self, ids: &[Id]) -> bool {
        self.parent_ids(ids).len() != self.unique_parent_ids(ids).len()
    }

    pub fn subtree_by_id(&self, id: Id) -> Option<&[Id]> {
        self.link_by_id(id).map(Link::subtree)
    }

    pub fn total_subtree_count(&self) -> usize {
        self.joints
            .iter()
            .filter_map(|joint| self.subtree_by_id(joint.id()))
            .map(<[Id]>::len)
            .sum()
    }

    /// Link ids on the path from `id` up to the root, nearest first,
    /// excluding `id` itself and the root.
    pub fn ancestors_by_id(&self, id: Id) -> Vec<Id> {
        let mut ancestors = Vec::new();
        let mut current = id;
        // a tree never has a chain longer than its link count
        for _ in 0..self.links.len() {
            match self.parent_id(current) {
                Some(parent) if !parent.is_root() => {
                    ancestors.push(parent);
                    current = parent;
                }
                _ => break,
            }
        }
        ancestors
    }

    pub fn total_ancestor_count(&self) -> usize {
        self.joints
            .iter()
            .map(|joint| self.ancestors_by_id(joint.id()).len())
            .sum()
    }

    /// Whether `id` lies on the path from `of` to the root.
    pub fn is_ancestor_of(&self, id: Id, of: Id) -> bool {
        self.ancestors_by_id(of).contains(&id)
    }

    pub fn is_in_subtree_of(&self, id: Id, of: Id) -> bool {
        self.subtree_by_id(of)
            .is_some_and(|subtree| subtree.binary_search(&id).is_ok())
    }

    // breadth first levels

    /// None for a robot without joints.
    pub fn max_bfs_level(&self) -> Option<i32> {
        self.joints.iter().map(Joint::bfs_level).max()
    }

    /// Canonical ids of the joints at `level`.
    pub fn ids_by_bfs_level(&self, level: i32) -> Vec<Id> {
        self.joints_by_bfs_level(level)
            .into_iter()
            .map(Joint::id)
            .collect()
    }

    pub fn bfs_level_by_id(&self, id: Id) -> Option<i32> {
        self.joint_by_id(id).map(Joint::bfs_level)
    }

    /// Largest number of joints sharing a level.
    pub fn max_bfs_width(&self) -> usize {
        let mut widths: HashMap<i32, usize> = HashMap::new();
        for joint in &self.joints {
            *widths.entry(joint.bfs_level()).or_default() += 1;
        }
        widths.into_values().max().unwrap_or(0)
    }

    pub fn joints_by_bfs_level(&self, level: i32) -> Vec<&Joint> {
        self.joints
            .iter()
            .filter(|joint| joint.bfs_level() == level)
            .collect()
    }

    pub fn links_by_bfs_level(&self, level: i32) -> Vec<&Link> {
        self.links
            .iter()
            .filter(|link| link.bfs_level() == level)
            .collect()
    }

    // joints

    pub fn joint_by_id(&self, id: Id) -> Option<&Joint> {
        self.joints.get(id.index()?)
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joint_names
            .get(name)
            .and_then(|index| self.joints.get(*index))
    }

    pub fn joints_by_parent_name(&self, parent: &str) -> Vec<&Joint> {
        self.joints
            .iter()
            .filter(|joint| joint.parent() == parent)
            .collect()
    }

    pub fn joints_by_child_name(&self, child: &str) -> Vec<&Joint> {
        self.joints
            .iter()
            .filter(|joint| joint.child() == child)
            .collect()
    }

    pub fn joint_by_parent_child_name(&self, parent: &str, child: &str) -> Option<&Joint> {
        self.joints
            .iter()
            .find(|joint| joint.parent() == parent && joint.child() == child)
    }

    pub fn joints_ordered_by_id(&self, reverse: bool) -> Vec<&Joint> {
        let mut joints: Vec<&Joint> = self.joints.iter().collect();
        if reverse {
            joints.reverse();
        }
        joints
    }

    pub fn joints_ordered_by_name(&self, reverse: bool) -> Vec<&Joint> {
        let mut joints: Vec<&Joint> = self.joints.iter().collect();
        joints.sort_by(|a, b| a.name().cmp(b.name()));
        if reverse {
            joints.reverse();
        }
        joints
    }

    pub fn joints_by_id_map(&self) -> HashMap<Id, &Joint> {
        self.joints.iter().map(|joint| (joint.id(), joint)).collect()
    }

    pub fn joints_by_name_map(&self) -> HashMap<&str, &Joint> {
        self.joints
            .iter()
            .map(|joint| (joint.name(), joint))
            .collect()
    }

    pub fn damping_by_id(&self, id: Id) -> Option<f64> {
        self.joint_by_id(id).map(Joint::damping)
    }

    // links

    pub fn link_by_id(&self, id: Id) -> Option<&Link> {
        let index = usize::try_from(id.value() + 1).ok()?;
        self.links.get(index)
    }

    pub fn link_by_name(&self, name: &str) -> Option<&Link> {
        self.link_names
            .get(name)
            .and_then(|index| self.links.get(*index))
    }

    pub fn links_ordered_by_id(&self, reverse: bool) -> Vec<&Link> {
        let mut links: Vec<&Link> = self.links.iter().collect();
        if reverse {
            links.reverse();
        }
        links
    }

    pub fn links_ordered_by_name(&self, reverse: bool) -> Vec<&Link> {
        let mut links: Vec<&Link> = self.links.iter().collect();
        links.sort_by(|a, b| a.name().cmp(b.name()));
        if reverse {
            links.reverse();
        }
        links
    }

    pub fn links_by_id_map(&self) -> HashMap<Id, &Link> {
        self.links.iter().map(|link| (link.id(), link)).collect()
    }

    pub fn links_by_name_map(&self) -> HashMap<&str, &Link> {
        self.links.iter().map(|link| (link.name(), link)).collect()
    }

    // joint transforms

    pub fn transform_by_id(&self, id: Id) -> Option<&JointTransform> {
        self.joint_by_id(id).map(Joint::transform)
    }

    pub fn transform_by_name(&self, name: &str) -> Option<&JointTransform> {
        self.joint_by_name(name).map(Joint::transform)
    }

    pub fn transforms_by_bfs_level(&self, level: i32) -> Vec<&JointTransform> {
        self.joints_by_bfs_level(level)
            .into_iter()
            .map(Joint::transform)
            .collect()
    }

    pub fn transforms_ordered_by_id(&self, reverse: bool) -> Vec<&JointTransform> {
        self.joints_ordered_by_id(reverse)
            .into_iter()
            .map(Joint::transform)
            .collect()
    }

    pub fn transforms_ordered_by_name(&self, reverse: bool) -> Vec<&JointTransform> {
        self.joints_ordered_by_name(reverse)
            .into_iter()
            .map(Joint::transform)
            .collect()
    }

    pub fn transforms_by_id_map(&self) -> HashMap<Id, &JointTransform> {
        self.joints
            .iter()
            .map(|joint| (joint.id(), joint.transform()))
            .collect()
    }

    pub fn transforms_by_name_map(&self) -> HashMap<&str, &JointTransform> {
        self.joints
            .iter()
            .map(|joint| (joint.name(), joint.transform()))
            .collect()
    }

    // link inertias

    pub fn spatial_inertia_by_id(&self, id: Id) -> Option<&SpatialInertia> {
        self.link_by_id(id).map(Link::spatial_inertia)
    }

    pub fn spatial_inertia_by_name(&self, name: &str) -> Option<&SpatialInertia> {
        self.link_by_name(name).map(Link::spatial_inertia)
    }

    pub fn spatial_inertias_by_bfs_level(&self, level: i32) -> Vec<&SpatialInertia> {
        self.links_by_bfs_level(level)
            .into_iter()
            .map(Link::spatial_inertia)
            .collect()
    }

    pub fn spatial_inertias_ordered_by_id(&self, reverse: bool) -> Vec<&SpatialInertia> {
        self.links_ordered_by_id(reverse)
            .into_iter()
            .map(Link::spatial_inertia)
            .collect()
    }

    pub fn spatial_inertias_ordered_by_name(&self, reverse: bool) -> Vec<&SpatialInertia> {
        self.links_ordered_by_name(reverse)
            .into_iter()
            .map(Link::spatial_inertia)
            .collect()
    }

    pub fn spatial_inertias_by_id_map(&self) -> HashMap<Id, &SpatialInertia> {
        self.links
            .iter()
            .map(|link| (link.id(), link.spatial_inertia()))
            .collect()
    }

    pub fn spatial_inertias_by_name_map(&self) -> HashMap<&str, &SpatialInertia> {
        self.links
            .iter()
            .map(|link| (link.name(), link.spatial_inertia()))
            .collect()
    }

    // motion subspaces

    pub fn subspace_by_id(&self, id: Id) -> Option<MotionVector> {
        self.joint_by_id(id).map(Joint::motion_subspace)
    }

    pub fn subspace_by_name(&self, name: &str) -> Option<MotionVector> {
        self.joint_by_name(name).map(Joint::motion_subspace)
    }

    pub fn subspaces_by_bfs_level(&self, level: i32) -> Vec<MotionVector> {
        self.joints_by_bfs_level(level)
            .into_iter()
            .map(Joint::motion_subspace)
            .collect()
    }

    pub fn subspaces_ordered_by_id(&self, reverse: bool) -> Vec<MotionVector> {
        self.joints_ordered_by_id(reverse)
            .into_iter()
            .map(Joint::motion_subspace)
            .collect()
    }

    pub fn subspaces_ordered_by_name(&self, reverse: bool) -> Vec<MotionVector> {
        self.joints_ordered_by_name(reverse)
            .into_iter()
            .map(Joint::motion_subspace)
            .collect()
    }

    pub fn subspaces_by_id_map(&self) -> HashMap<Id, MotionVector> {
        self.joints
            .iter()
            .map(|joint| (joint.id(), joint.motion_subspace()))
            .collect()
    }

    pub fn subspaces_by_name_map(&self) -> HashMap<&str, MotionVector> {
        self.joints
            .iter()
            .map(|joint| (joint.name(), joint.motion_subspace()))
            .collect()
    }

    /// Whether all the joints share one motion subspace. Unknown ids compare
    /// as different, an empty list is trivially identical.
    pub fn are_subspaces_identical(&self, ids: &[Id]) -> bool {
        let Some(first) = ids.first() else {
            return true;
        };
        let Some(reference) = self.subspace_by_id(*first) else {
            return false;
        };
        ids.iter()
            .all(|id| self.subspace_by_id(*id) == Some(reference))
    }
}

/// Links sorted by id must read -1, 0, 1, ... and joint i must end at link i,
/// hanging off a link numbered before it.
fn check_numbering(links: &[Link], joints: &[Joint]) -> Result<(), RobotModelErrors> {
    if links.len() != joints.len() + 1 {
        return Err(RobotModelErrors::MalformedInput(format!(
            "{} links cannot hang below {} joints",
            links.len(),
            joints.len()
        )));
    }
    for (slot, link) in links.iter().enumerate() {
        let expected = if slot == 0 { Id::ROOT } else { Id::new(slot - 1) };
        if link.id() != expected {
            return Err(RobotModelErrors::MalformedInput(format!(
                "link '{}' has id {}, expected {expected}",
                link.name(),
                link.id()
            )));
        }
    }
    for (index, joint) in joints.iter().enumerate() {
        let child = &links[index + 1];
        if joint.id() != child.id() || joint.child() != child.name() {
            return Err(RobotModelErrors::MalformedInput(format!(
                "joint '{}' with id {} does not end at link '{}'",
                joint.name(),
                joint.id(),
                child.name()
            )));
        }
        let parent_slot = usize::try_from(child.parent_id().value() + 1).ok();
        let parent = parent_slot.and_then(|slot| links.get(slot));
        if child.parent_id() >= child.id() || parent.map(Link::name) != Some(joint.parent()) {
            return Err(RobotModelErrors::MalformedInput(format!(
                "joint '{}' does not hang off link '{}' numbered before it",
                joint.name(),
                joint.parent()
            )));
        }
    }
    Ok(())
}
