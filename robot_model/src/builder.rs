use crate::{
    Id, RobotModelErrors,
    joint::{Joint, JointType},
    link::{Link, LinkBuilder},
    record::{
        JointRecord, LinkRecord, OriginRecord, RobotRecord, parse_scalar, parse_triple, required,
    },
    robot::Robot,
};
use mass_properties::InertiaSet;
use serde::{Deserialize, Serialize};
use spatial_algebra::{Origin, OriginBuilder};
use std::{
    collections::{BTreeSet, HashMap, HashSet, VecDeque},
    fs,
    path::Path,
};
use tolerance::NoiseTolerance;

/// Settings for turning a description into a canonical model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderOptions {
    /// Visit sibling joints by name instead of by declaration order.
    pub alpha_tie_breaker: bool,
    pub tolerance: NoiseTolerance,
}

impl BuilderOptions {
    pub fn with_alpha_tie_breaker(mut self, alpha_tie_breaker: bool) -> Self {
        self.alpha_tie_breaker = alpha_tie_breaker;
        self
    }

    pub fn with_tolerance(mut self, tolerance: NoiseTolerance) -> Self {
        self.tolerance = tolerance;
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

/// Holds the links and joints of a description while it is being reduced
/// to a canonical tree.
///
/// Fixed joints are folded into their parent links first, then the remaining
/// tree is numbered depth first from the root, leveled breadth first, and the
/// subtree of every link is collected.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    options: BuilderOptions,
    links: Vec<Link>,
    joints: Vec<Joint>,
}

impl ModelBuilder {
    /// Parses and checks a description in one go.
    pub fn build(record: &RobotRecord, options: BuilderOptions) -> Result<Robot, RobotModelErrors> {
        Self::from_record(record, options)?.finish()
    }

    pub fn from_record(
        record: &RobotRecord,
        options: BuilderOptions,
    ) -> Result<Self, RobotModelErrors> {
        let name = required(&record.name, || "robot name".to_string())?;
        let tolerance = &options.tolerance;

        let links = record
            .links
            .iter()
            .enumerate()
            .map(|(urdf_id, link)| parse_link(link, urdf_id, tolerance))
            .collect::<Result<Vec<_>, _>>()?;
        let joints = record
            .joints
            .iter()
            .enumerate()
            .map(|(urdf_id, joint)| parse_joint(joint, urdf_id, tolerance))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(name, links, joints, options)
    }

    /// Checks that every joint connects two known links and that no link
    /// hangs below more than one joint.
    pub fn new(
        name: &str,
        links: Vec<Link>,
        joints: Vec<Joint>,
        options: BuilderOptions,
    ) -> Result<Self, RobotModelErrors> {
        if Id::checked(links.len()).is_none() {
            return Err(RobotModelErrors::MalformedInput(format!(
                "{} links cannot be numbered with 32 bit ids",
                links.len()
            )));
        }

        let mut link_names = HashSet::with_capacity(links.len());
        for link in &links {
            if !link_names.insert(link.name()) {
                return Err(RobotModelErrors::MalformedInput(format!(
                    "link name '{}' is used more than once",
                    link.name()
                )));
            }
        }

        let mut joint_names = HashSet::with_capacity(joints.len());
        let mut children = HashSet::with_capacity(joints.len());
        for joint in &joints {
            if !joint_names.insert(joint.name()) {
                return Err(RobotModelErrors::MalformedInput(format!(
                    "joint name '{}' is used more than once",
                    joint.name()
                )));
            }
            for end in [joint.parent(), joint.child()] {
                if !link_names.contains(end) {
                    return Err(RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                        "joint '{}' refers to unknown link '{end}'",
                        joint.name()
                    )));
                }
            }
            if joint.parent() == joint.child() {
                return Err(RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                    "joint '{}' connects link '{}' to itself",
                    joint.name(),
                    joint.child()
                )));
            }
            if !children.insert(joint.child()) {
                return Err(RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                    "link '{}' is the child of more than one joint",
                    joint.child()
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            options,
            links,
            joints,
        })
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn finish(mut self) -> Result<Robot, RobotModelErrors> {
        self.remove_fixed_joints()?;
        let root = self.find_root()?;
        self.renumber(root)?;
        self.level(root);
        self.build_subtrees();
        self.report_joint_order();
        Robot::from_parts(&self.name, self.links, self.joints)
    }

    /// Folds every fixed joint, in declaration order, until none remain.
    pub fn remove_fixed_joints(&mut self) -> Result<(), RobotModelErrors> {
        while let Some(index) = self.joints.iter().position(|joint| joint.joint_type().is_fixed()) {
            self.fold_fixed_joint(index)?;
        }
        Ok(())
    }

    /// Merges the child link of a fixed joint into its parent link.
    ///
    /// The child's inertia is carried into the parent frame with X^T I X and
    /// joints that hung off the child now hang off the parent, with the fixed
    /// transform appended to their own.
    fn fold_fixed_joint(&mut self, index: usize) -> Result<(), RobotModelErrors> {
        // both ends are resolved before anything is removed
        let fixed = &self.joints[index];
        let child_index = self.link_position(fixed.child(), fixed.name())?;
        let mut parent_index = self.link_position(fixed.parent(), fixed.name())?;

        let fixed = self.joints.remove(index);
        let tolerance = self.options.tolerance;
        let x = *fixed.transform().fixed();
        let child = self.links.remove(child_index);
        if parent_index > child_index {
            parent_index -= 1;
        }
        self.links[parent_index].add_inertia(x.congruence(child.spatial_inertia()), &tolerance);

        let mut rewired = 0;
        for joint in self
            .joints
            .iter_mut()
            .filter(|joint| joint.parent() == fixed.child())
        {
            joint.set_parent(fixed.parent());
            joint.transform_mut().compose_fixed(&x, &tolerance);
            rewired += 1;
        }

        tracing::debug!(
            "Folded fixed joint '{}': link '{}' merged into '{}', {} joint(s) rewired",
            fixed.name(),
            fixed.child(),
            fixed.parent(),
            rewired
        );
        Ok(())
    }

    fn link_position(&self, name: &str, joint: &str) -> Result<usize, RobotModelErrors> {
        self.links
            .iter()
            .position(|link| link.name() == name)
            .ok_or_else(|| {
                RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                    "joint '{joint}' refers to unknown link '{name}'"
                ))
            })
    }

    /// The root is the one link that is not the child of any joint.
    fn find_root(&self) -> Result<usize, RobotModelErrors> {
        let children: HashSet<&str> = self.joints.iter().map(Joint::child).collect();
        let roots: Vec<usize> = self
            .links
            .iter()
            .enumerate()
            .filter(|(_, link)| !children.contains(link.name()))
            .map(|(index, _)| index)
            .collect();
        match roots.as_slice() {
            [] => Err(RobotModelErrors::NoRoot),
            [root] => Ok(*root),
            _ => Err(RobotModelErrors::MultipleRoots(
                roots
                    .iter()
                    .map(|index| self.links[*index].name().to_string())
                    .collect(),
            )),
        }
    }

    /// Joints below a link, in the order they are visited.
    fn children_of(&self, link_name: &str) -> Vec<usize> {
        let mut children: Vec<usize> = self
            .joints
            .iter()
            .enumerate()
            .filter(|(_, joint)| joint.parent() == link_name)
            .map(|(index, _)| index)
            .collect();
        if self.options.alpha_tie_breaker {
            children.sort_by(|a, b| self.joints[*a].name().cmp(self.joints[*b].name()));
        }
        children
    }

    fn link_indices(&self) -> HashMap<String, usize> {
        self.links
            .iter()
            .enumerate()
            .map(|(index, link)| (link.name().to_string(), index))
            .collect()
    }

    /// Depth first preorder numbering. A joint and its child link share an
    /// id, so every parent id is smaller than the ids below it.
    fn renumber(&mut self, root: usize) -> Result<(), RobotModelErrors> {
        let indices = self.link_indices();
        let mut numbered = vec![false; self.links.len()];
        self.links[root].set_id(Id::ROOT, Id::ROOT);
        numbered[root] = true;

        let mut next = 0;
        let mut stack: Vec<usize> = self.children_of(self.links[root].name());
        stack.reverse();
        while let Some(joint_index) = stack.pop() {
            let joint = &self.joints[joint_index];
            let (Some(&parent), Some(&child)) =
                (indices.get(joint.parent()), indices.get(joint.child()))
            else {
                return Err(RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                    "joint '{}' refers to an unknown link",
                    joint.name()
                )));
            };
            if numbered[child] {
                return Err(RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                    "link '{}' is reached twice",
                    joint.child()
                )));
            }

            let id = Id::new(next);
            next += 1;
            let parent_id = self.links[parent].id();
            self.joints[joint_index].set_id(id);
            self.links[child].set_id(id, parent_id);
            numbered[child] = true;

            let mut children = self.children_of(self.links[child].name());
            children.reverse();
            stack.extend(children);
        }

        if let Some(unreached) = numbered.iter().position(|numbered| !numbered) {
            return Err(RobotModelErrors::CyclicOrDisconnectedTopology(format!(
                "link '{}' cannot be reached from root '{}'",
                self.links[unreached].name(),
                self.links[root].name()
            )));
        }
        Ok(())
    }

    /// Breadth first ids and levels. The root sits at level -1 so the joints
    /// attached to it are level 0.
    fn level(&mut self, root: usize) {
        let indices = self.link_indices();
        self.links[root].set_bfs(Id::ROOT, -1);

        let mut next = 0;
        let mut queue: VecDeque<(usize, i32)> = self
            .children_of(self.links[root].name())
            .into_iter()
            .map(|joint| (joint, 0))
            .collect();
        while let Some((joint_index, level)) = queue.pop_front() {
            let Some(&child) = indices.get(self.joints[joint_index].child()) else {
                continue;
            };
            let bfs_id = Id::new(next);
            next += 1;
            self.joints[joint_index].set_bfs(bfs_id, level);
            self.links[child].set_bfs(bfs_id, level);
            queue.extend(
                self.children_of(self.links[child].name())
                    .into_iter()
                    .map(|joint| (joint, level + 1)),
            );
        }
    }

    /// Each link's subtree is itself plus its children's subtrees. Children
    /// always carry larger ids, so one pass from the highest id up suffices.
    fn build_subtrees(&mut self) {
        // slot 0 is the root, slot i + 1 is id i
        let slot = |id: Id| usize::try_from(id.value() + 1).ok();
        let mut subtrees: Vec<BTreeSet<Id>> = vec![BTreeSet::new(); self.links.len()];
        let mut parents = vec![Id::ROOT; self.links.len()];
        for link in &self.links {
            if let Some(s) = slot(link.id()).filter(|s| *s < subtrees.len()) {
                subtrees[s].insert(link.id());
                parents[s] = link.parent_id();
            }
        }

        for s in (1..subtrees.len()).rev() {
            if let Some(p) = slot(parents[s]) {
                let below: Vec<Id> = subtrees[s].iter().copied().collect();
                subtrees[p].extend(below);
            }
        }

        for link in &mut self.links {
            if let Some(s) = slot(link.id()).filter(|s| *s < subtrees.len()) {
                link.set_subtree(subtrees[s].iter().copied().collect());
            }
        }
    }

    fn report_joint_order(&self) {
        let mut joints: Vec<&Joint> = self.joints.iter().collect();
        joints.sort_by_key(|joint| joint.id());
        let order: Vec<&str> = joints.iter().map(|joint| joint.name()).collect();
        tracing::info!(
            "Assumed input joint configuration ordering for '{}': [{}], total of n = {} joints",
            self.name,
            order.join(", "),
            order.len()
        );
    }
}

fn parse_origin(
    record: &OriginRecord,
    owner: &str,
    tolerance: &NoiseTolerance,
) -> Result<Origin, RobotModelErrors> {
    let xyz_what = format!("origin xyz of {owner}");
    let rpy_what = format!("origin rpy of {owner}");
    let xyz = parse_triple(required(&record.xyz, || xyz_what.clone())?, &xyz_what)?;
    let rpy = parse_triple(required(&record.rpy, || rpy_what.clone())?, &rpy_what)?;
    Ok(OriginBuilder::new()
        .with_translation(xyz[0], xyz[1], xyz[2])
        .with_rotation(rpy[0], rpy[1], rpy[2])
        .build(tolerance)?)
}

/// A link without an origin or inertial properties is taken to be the fixed
/// world base frame.
fn parse_link(
    record: &LinkRecord,
    urdf_id: usize,
    tolerance: &NoiseTolerance,
) -> Result<Link, RobotModelErrors> {
    let name = required(&record.name, || format!("name of link #{urdf_id}"))?;
    let owner = format!("link '{name}'");

    let origin = match &record.origin {
        Some(origin) => parse_origin(origin, &owner, tolerance)?,
        None => {
            tracing::warn!(
                "Link '{}' does not have an origin, assuming it is the fixed world base frame",
                name
            );
            Origin::identity()
        }
    };

    let (mass, inertia) = match &record.inertial {
        Some(inertial) => {
            let mass_what = format!("mass of {owner}");
            let mass = parse_scalar(required(&inertial.mass, || mass_what.clone())?, &mass_what)?;
            let inertia = inertial.inertia.as_ref().ok_or_else(|| {
                RobotModelErrors::MalformedInput(format!("missing inertia of {owner}"))
            })?;
            let values = [
                (&inertia.ixx, "ixx"),
                (&inertia.ixy, "ixy"),
                (&inertia.ixz, "ixz"),
                (&inertia.iyy, "iyy"),
                (&inertia.iyz, "iyz"),
                (&inertia.izz, "izz"),
            ]
            .into_iter()
            .map(|(value, key)| {
                let what = format!("{key} of {owner}");
                parse_scalar(required(value, || what.clone())?, &what)
            })
            .collect::<Result<Vec<f64>, _>>()?;
            (
                mass,
                InertiaSet::new(values[0], values[1], values[2], values[3], values[4], values[5]),
            )
        }
        None => {
            tracing::warn!(
                "Link '{}' does not have inertial properties, assuming it is the fixed world base frame",
                name
            );
            (0.0, InertiaSet::zero())
        }
    };

    LinkBuilder::new(name)
        .with_origin(origin)
        .with_inertial(mass, inertia)
        .build(urdf_id, tolerance)
}

fn parse_joint(
    record: &JointRecord,
    urdf_id: usize,
    tolerance: &NoiseTolerance,
) -> Result<Joint, RobotModelErrors> {
    let name = required(&record.name, || format!("name of joint #{urdf_id}"))?;
    let owner = format!("joint '{name}'");
    let type_name = required(&record.joint_type, || format!("type of {owner}"))?;
    let parent = required(&record.parent, || format!("parent of {owner}"))?;
    let child = required(&record.child, || format!("child of {owner}"))?;

    let origin = record
        .origin
        .as_ref()
        .ok_or_else(|| RobotModelErrors::MalformedInput(format!("missing origin of {owner}")))?;
    let origin = parse_origin(origin, &owner, tolerance)?;

    let axis = match &record.axis {
        Some(axis) => {
            let what = format!("axis of {owner}");
            Some(parse_triple(required(&axis.xyz, || what.clone())?, &what)?)
        }
        None => None,
    };
    let joint_type = JointType::parse(type_name, axis)?;

    let damping = match record.dynamics.as_ref().and_then(|d| d.damping.as_ref()) {
        Some(damping) => parse_scalar(damping, &format!("damping of {owner}"))?,
        None => 0.0,
    };

    Ok(
        Joint::new(name, urdf_id, parent, child, joint_type, origin, tolerance)
            .with_damping(damping),
    )
}
