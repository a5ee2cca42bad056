use approx::assert_abs_diff_eq;
use nalgebra::{Matrix3, Vector6};
use crate::{
    BuilderOptions, Id, ModelBuilder, Robot, RobotModelErrors, RobotRecord,
    record::{JointRecord, LinkRecord},
};
use spatial_algebra::skew;
use std::{f64::consts::FRAC_PI_2, path::Path};

const UNIT_INERTIA: [&str; 6] = ["1", "0", "0", "1", "0", "1"];
const ZERO_INERTIA: [&str; 6] = ["0", "0", "0", "0", "0", "0"];

fn link(name: &str, mass: &str) -> LinkRecord {
    LinkRecord::new(name)
        .with_origin("0 0 0", "0 0 0")
        .with_inertial(mass, UNIT_INERTIA)
}

fn base(name: &str) -> LinkRecord {
    LinkRecord::new(name)
        .with_origin("0 0 0", "0 0 0")
        .with_inertial("0", ZERO_INERTIA)
}

fn joint(name: &str, joint_type: &str, parent: &str, child: &str) -> JointRecord {
    JointRecord::new(name, joint_type, parent, child)
        .with_origin("0 0 0.5", "0 0 0")
        .with_axis("0 0 1")
}

fn build(record: &RobotRecord) -> Result<Robot, RobotModelErrors> {
    ModelBuilder::build(record, BuilderOptions::default())
}

/// A branched tree with fixed joints in the middle and at the leaves.
///
/// ```text
/// base -> torso -(fixed)-> chest -> arm_l -> hand_l -(fixed)-> tool
///                               \-> arm_r
///      -> leg -> foot
/// ```
fn humanoid() -> RobotRecord {
    RobotRecord::new("humanoid")
        .with_link(base("base"))
        .with_link(link("torso", "10"))
        .with_link(link("chest", "5"))
        .with_link(link("arm_l", "2"))
        .with_link(link("hand_l", "0.5"))
        .with_link(link("tool", "0.2"))
        .with_link(link("arm_r", "2"))
        .with_link(link("leg", "4"))
        .with_link(link("foot", "1"))
        .with_joint(joint("waist", "revolute", "base", "torso"))
        .with_joint(joint("neck_mount", "fixed", "torso", "chest").with_origin("0 0 0.4", "0 0 0"))
        .with_joint(joint("shoulder_l", "revolute", "chest", "arm_l").with_axis("0 1 0"))
        .with_joint(joint("wrist_l", "prismatic", "arm_l", "hand_l"))
        .with_joint(joint("tool_mount", "fixed", "hand_l", "tool"))
        .with_joint(joint("shoulder_r", "revolute", "chest", "arm_r").with_axis("0 1 0"))
        .with_joint(joint("hip", "revolute", "base", "leg").with_axis("1 0 0"))
        .with_joint(joint("ankle", "revolute", "leg", "foot").with_axis("1 0 0"))
}

#[test]
fn three_link_chain_folds_the_fixed_joint() {
    let record = RobotRecord::new("three_link")
        .with_link(base("base"))
        .with_link(link("a", "1"))
        .with_link(link("b", "2"))
        .with_joint(
            JointRecord::new("hinge", "revolute", "base", "a")
                .with_origin("0 0 0", "0 0 0")
                .with_axis("0 0 1"),
        )
        .with_joint(JointRecord::new("weld", "fixed", "a", "b").with_origin("1 0 0", "0 0 0"));
    let robot = build(&record).unwrap();

    assert_eq!(robot.num_joints(), 1);
    assert_eq!(robot.num_links(), 2);
    assert_eq!(robot.joint_by_id(Id::new(0)).unwrap().name(), "hinge");
    assert!(robot.link_by_name("b").is_none());

    let inertia = robot.spatial_inertia_by_name("a").unwrap().matrix();
    let coupling = skew(1.0, 0.0, 0.0) * 2.0;
    assert_abs_diff_eq!(
        inertia.fixed_view::<3, 3>(0, 3).into_owned(),
        coupling,
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        inertia.fixed_view::<3, 3>(3, 0).into_owned(),
        coupling.transpose(),
        epsilon = 1e-12
    );
    // own unit inertia plus b's unit inertia shifted one unit along x
    assert_abs_diff_eq!(
        inertia.fixed_view::<3, 3>(0, 0).into_owned(),
        Matrix3::from_diagonal(&nalgebra::Vector3::new(2.0, 4.0, 4.0)),
        epsilon = 1e-12
    );
    assert_abs_diff_eq!(
        inertia.fixed_view::<3, 3>(3, 3).into_owned(),
        Matrix3::identity() * 3.0,
        epsilon = 1e-12
    );
}

#[test]
fn motion_subspaces_follow_the_axis() {
    let record = RobotRecord::new("subspaces")
        .with_link(base("base"))
        .with_link(link("a", "1"))
        .with_link(link("b", "1"))
        .with_joint(joint("spin", "revolute", "base", "a"))
        .with_joint(joint("slide", "prismatic", "a", "b").with_axis("1 0 0"));
    let robot = build(&record).unwrap();

    assert_eq!(
        robot.subspace_by_name("spin").unwrap().vector(),
        Vector6::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0)
    );
    assert_eq!(
        robot.subspace_by_name("slide").unwrap().vector(),
        Vector6::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    );
}

#[test]
fn unknown_link_names_are_reported() {
    let missing_child = RobotRecord::new("broken")
        .with_link(base("base"))
        .with_joint(joint("j", "revolute", "base", "ghost"));
    assert!(matches!(
        build(&missing_child),
        Err(RobotModelErrors::CyclicOrDisconnectedTopology(_))
    ));

    let missing_parent = RobotRecord::new("broken")
        .with_link(base("base"))
        .with_link(link("a", "1"))
        .with_joint(joint("j", "fixed", "ghost", "a"));
    assert!(matches!(
        build(&missing_parent),
        Err(RobotModelErrors::CyclicOrDisconnectedTopology(_))
    ));
}

#[test]
fn ids_are_contiguous_and_parents_come_first() {
    let robot = build(&humanoid()).unwrap();
    let n = robot.num_joints();
    assert_eq!(n, 6);
    assert_eq!(robot.num_links(), n + 1);

    let mut joint_ids: Vec<i32> = robot.joints().iter().map(|j| j.id().value()).collect();
    joint_ids.sort();
    assert_eq!(joint_ids, (0..n as i32).collect::<Vec<_>>());

    for joint in robot.joints() {
        let child = robot.link_by_name(joint.child()).unwrap();
        let parent = robot.link_by_name(joint.parent()).unwrap();
        assert_eq!(child.id(), joint.id());
        assert_eq!(child.parent_id(), parent.id());
        assert!(parent.id() < joint.id());
    }
    assert_eq!(robot.root().unwrap().name(), "base");
    assert!(robot.link_by_name("chest").is_none());
    assert!(robot.link_by_name("tool").is_none());
    assert_eq!(robot.joint_by_name("shoulder_l").unwrap().parent(), "torso");
}

#[test]
fn depth_first_order_follows_declaration() {
    let robot = build(&humanoid()).unwrap();
    let order: Vec<&str> = robot.joints().iter().map(|joint| joint.name()).collect();
    assert_eq!(
        order,
        vec!["waist", "shoulder_l", "wrist_l", "shoulder_r", "hip", "ankle"]
    );
}

#[test]
fn subtrees_contain_their_descendants() {
    let robot = build(&humanoid()).unwrap();
    for link in robot.links().iter().filter(|link| !link.is_root()) {
        let id = link.id();
        let subtree = robot.subtree_by_id(id).unwrap();
        assert!(subtree.contains(&id));
        assert!(subtree.windows(2).all(|pair| pair[0] < pair[1]));
        for member in subtree.iter().filter(|member| **member != id) {
            assert!(robot.is_ancestor_of(id, *member));
        }
        let parent = link.parent_id();
        if !parent.is_root() {
            assert!(robot.is_in_subtree_of(id, parent));
        }
        let parent_subtree = robot.subtree_by_id(parent).unwrap();
        assert!(subtree.iter().all(|member| parent_subtree.contains(member)));
    }
    assert_eq!(
        robot.subtree_by_id(Id::new(0)).unwrap(),
        &[Id::new(0), Id::new(1), Id::new(2), Id::new(3)]
    );
}

#[test]
fn ancestor_count_matches_bfs_level() {
    let robot = build(&humanoid()).unwrap();
    for joint in robot.joints() {
        assert_eq!(
            robot.ancestors_by_id(joint.id()).len() as i32,
            joint.bfs_level(),
            "joint {}",
            joint.name()
        );
    }
    assert_eq!(robot.max_bfs_level(), Some(2));
    assert_eq!(robot.max_bfs_width(), 3);
}

#[test]
fn breadth_first_ids_differ_from_depth_first() {
    let record = RobotRecord::new("fork")
        .with_link(base("base"))
        .with_link(link("a", "1"))
        .with_link(link("b", "1"))
        .with_link(link("c", "1"))
        .with_joint(joint("j_a", "revolute", "base", "a"))
        .with_joint(joint("j_b", "revolute", "a", "b"))
        .with_joint(joint("j_c", "revolute", "base", "c"));
    let robot = build(&record).unwrap();

    let j_b = robot.joint_by_name("j_b").unwrap();
    let j_c = robot.joint_by_name("j_c").unwrap();
    assert_eq!((j_b.id(), j_b.bfs_id(), j_b.bfs_level()), (Id::new(1), Id::new(2), 1));
    assert_eq!((j_c.id(), j_c.bfs_id(), j_c.bfs_level()), (Id::new(2), Id::new(1), 0));
    let root = robot.root().unwrap();
    assert_eq!((root.bfs_id(), root.bfs_level()), (Id::ROOT, -1));
    assert_eq!(robot.link_by_name("b").unwrap().bfs_id(), Id::new(2));
}

#[test]
fn alpha_tie_breaker_orders_siblings_by_name() {
    let record = RobotRecord::new("siblings")
        .with_link(base("base"))
        .with_link(link("z_link", "1"))
        .with_link(link("a_link", "1"))
        .with_joint(joint("zeta", "revolute", "base", "z_link"))
        .with_joint(joint("alpha", "revolute", "base", "a_link"));

    let declared = build(&record).unwrap();
    assert_eq!(declared.joint_by_name("zeta").unwrap().id(), Id::new(0));

    let options = BuilderOptions::default().with_alpha_tie_breaker(true);
    let sorted = ModelBuilder::build(&record, options).unwrap();
    assert_eq!(sorted.joint_by_name("alpha").unwrap().id(), Id::new(0));
    assert_eq!(sorted.joint_by_name("alpha").unwrap().bfs_id(), Id::new(0));
    assert_eq!(sorted.link_by_name("z_link").unwrap().id(), Id::new(1));
}

#[test]
fn base_link_has_zero_inertia() {
    let record = RobotRecord::new("bare")
        .with_link(LinkRecord::new("world"))
        .with_link(link("a", "1"))
        .with_joint(joint("j", "revolute", "world", "a"));
    let robot = build(&record).unwrap();
    let world = robot.link_by_name("world").unwrap();
    assert!(world.is_root());
    assert!(world.is_world_base_frame());
    assert!(world.spatial_inertia().is_zero());
}

#[test]
fn roots_must_be_unique() {
    let two_roots = RobotRecord::new("two_roots")
        .with_link(base("base"))
        .with_link(base("other_base"))
        .with_link(link("a", "1"))
        .with_joint(joint("j", "revolute", "base", "a"));
    match build(&two_roots) {
        Err(RobotModelErrors::MultipleRoots(names)) => {
            assert_eq!(names, vec!["base".to_string(), "other_base".to_string()])
        }
        other => panic!("expected MultipleRoots, got {other:?}"),
    }

    let loop_only = RobotRecord::new("loop")
        .with_link(link("a", "1"))
        .with_link(link("b", "1"))
        .with_joint(joint("ab", "revolute", "a", "b"))
        .with_joint(joint("ba", "revolute", "b", "a"));
    assert!(matches!(build(&loop_only), Err(RobotModelErrors::NoRoot)));
}

#[test]
fn detached_cycles_are_rejected() {
    let record = RobotRecord::new("island")
        .with_link(base("base"))
        .with_link(link("a", "1"))
        .with_link(link("b", "1"))
        .with_link(link("c", "1"))
        .with_joint(joint("j_a", "revolute", "base", "a"))
        .with_joint(joint("bc", "revolute", "b", "c"))
        .with_joint(joint("cb", "revolute", "c", "b"));
    assert!(matches!(
        build(&record),
        Err(RobotModelErrors::CyclicOrDisconnectedTopology(_))
    ));
}

#[test]
fn unsupported_joints_are_rejected() {
    let continuous = RobotRecord::new("wheel")
        .with_link(base("base"))
        .with_link(link("wheel", "1"))
        .with_joint(joint("axle", "continuous", "base", "wheel"));
    assert!(matches!(
        build(&continuous),
        Err(RobotModelErrors::UnsupportedJointType(_))
    ));

    let negative_axis = RobotRecord::new("flipped")
        .with_link(base("base"))
        .with_link(link("a", "1"))
        .with_joint(joint("j", "revolute", "base", "a").with_axis("0 0 -1"));
    assert!(matches!(
        build(&negative_axis),
        Err(RobotModelErrors::UnsupportedJointType(_))
    ));
}

#[test]
fn malformed_attributes_are_rejected() {
    let bad_number = RobotRecord::new("typo")
        .with_link(base("base"))
        .with_link(LinkRecord::new("a").with_origin("0 0 zero", "0 0 0"))
        .with_joint(joint("j", "revolute", "base", "a"));
    assert!(matches!(
        build(&bad_number),
        Err(RobotModelErrors::MalformedInput(_))
    ));

    let mut unnamed = humanoid();
    unnamed.joints[2].name = None;
    assert!(matches!(
        build(&unnamed),
        Err(RobotModelErrors::MalformedInput(_))
    ));
}

#[test]
fn planar_arm_resource() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/planar_arm.ron");
    let record = RobotRecord::load(&path).unwrap();
    let robot = build(&record).unwrap();

    assert_eq!(robot.name(), "planar_arm");
    assert_eq!(robot.num_joints(), 3);
    assert!(robot.is_serial_chain());
    assert_eq!(robot.damping_by_id(Id::new(1)), Some(0.05));

    // the wrist mount yaw is snapped to exactly pi / 2
    let finger = robot.transform_by_name("finger").unwrap();
    let rotation = finger.fixed().rotation();
    assert_eq!(rotation[(0, 0)], 0.0);
    assert_eq!(rotation[(0, 1)], 1.0);
    assert_eq!(rotation[(1, 0)], -1.0);
    let q = 0.02;
    assert_abs_diff_eq!(
        finger.matrix(q),
        finger.free(q).0 * finger.fixed().0,
        epsilon = 1e-15
    );
    assert_eq!(robot.joint_by_name("finger").unwrap().parent(), "forearm");

    let unsnapped = ModelBuilder::build(
        &record,
        BuilderOptions::default()
            .with_tolerance(tolerance::NoiseTolerance::default().with_angle_tolerance(None)),
    )
    .unwrap();
    let raw = unsnapped.transform_by_name("finger").unwrap().fixed().rotation();
    assert_abs_diff_eq!(raw[(0, 1)], FRAC_PI_2.sin(), epsilon = 1e-6);
}
