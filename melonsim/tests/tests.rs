use melonsim::simulation::forces::{direct_repulsion, spring_force};
use melonsim::simulation::integrator::{apply_forces, reset_forces, scale_to_be_in_sphere};
use melonsim::{
    build_from_mesh, euler_step, BarnesHutRepulsion, ConfigError, DirectRepulsion, ForceSet, Link, NVec3, OctTree, Point, PointSet, Scenario,
    ScenarioConfig, SimulationParameters, Simulator, SphereMesh, SpringLinks, TopologyError,
};

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Build points at the given positions, ids in order, no masters
pub fn make_points(positions: &[[f64; 3]]) -> Vec<Point> {
    positions
        .iter()
        .enumerate()
        .map(|(i, p)| Point::new(i, NVec3::new(p[0], p[1], p[2])))
        .collect()
}

/// `n` well separated points inside the default sphere
pub fn scattered_points(n: usize) -> Vec<Point> {
    (0..n)
        .map(|i| {
            let i_f = i as f64;
            let x = NVec3::new(
                (i_f * 0.37).sin() * 500.0,
                (i_f * 0.13).cos() * 500.0,
                (i_f * 0.07).sin() * 500.0,
            );
            Point::new(i, x)
        })
        .collect()
}

/// Barnes–Hut force on every point; the tree may move points, so callers
/// compare against `points` as left by this call
pub fn tree_forces(points: &mut Vec<Point>, params: &SimulationParameters) -> Vec<NVec3> {
    let masters: Vec<usize> = (0..points.len()).collect();
    let mut rng = StdRng::seed_from_u64(7);
    let tree = OctTree::build(&masters, points, params, &mut rng);
    let points: &[Point] = points;

    masters
        .iter()
        .map(|&i| tree.force_on_point(i, points, params.charge, params.theta))
        .collect()
}

pub fn direct_forces(points: &[Point], charge: f64) -> Vec<NVec3> {
    let mut pts = points.to_vec();
    for p in pts.iter_mut() {
        p.f = NVec3::zeros();
    }
    let masters: Vec<usize> = (0..pts.len()).collect();
    direct_repulsion(&mut pts, &masters, charge);
    pts.iter().map(|p| p.f).collect()
}

/// Sum of |error| over sum of |exact|
pub fn relative_error(approx: &[NVec3], exact: &[NVec3]) -> f64 {
    let err: f64 = approx.iter().zip(exact).map(|(a, e)| (a - e).norm()).sum();
    let total: f64 = exact.iter().map(|e| e.norm()).sum();
    err / total
}

pub fn melon_simulator(width: usize, height: usize) -> Simulator {
    let mesh = SphereMesh::new(600.0, width, height);
    Simulator::from_mesh(&mesh, SimulationParameters::default(), 42).expect("valid sphere mesh")
}

pub fn assert_slaves_mirror_masters(sim: &Simulator) {
    let points = &sim.points().points;
    for p in points {
        if let Some(m) = p.master {
            assert_eq!(p.x, points[m].x, "slave {} differs from master {}", p.id, m);
        }
    }
}

// ==================================================================================
// Octree tests
// ==================================================================================

#[test]
fn barnes_hut_with_zero_theta_is_exact() {
    let params = SimulationParameters {
        theta: 0.0,
        ..Default::default()
    };
    let mut points = scattered_points(20);

    let approx = tree_forces(&mut points, &params);
    let exact = direct_forces(&points, params.charge);

    let err = relative_error(&approx, &exact);
    assert!(err < 1e-9, "theta = 0 should descend to every leaf, error {}", err);
}

#[test]
fn barnes_hut_error_shrinks_with_theta() {
    let mut errors = Vec::new();
    for theta in [0.3, 1.5] {
        let params = SimulationParameters {
            theta,
            ..Default::default()
        };
        let mut points = scattered_points(20);
        let approx = tree_forces(&mut points, &params);
        let exact = direct_forces(&points, params.charge);
        errors.push(relative_error(&approx, &exact));
    }

    assert!(errors[0] < 0.1, "theta = 0.3 too inaccurate: {}", errors[0]);
    assert!(errors[0] <= errors[1], "smaller theta gave larger error: {:?}", errors);
}

#[test]
fn single_body_tree_pushes_along_displacement() {
    let params = SimulationParameters::default();
    let mut points = make_points(&[[100.0, 0.0, 0.0], [400.0, 0.0, 0.0]]);
    let mut rng = StdRng::seed_from_u64(1);

    let mut tree = OctTree::new(&params);
    tree.insert(0, &mut points, &mut rng);
    tree.aggregate(&points);

    let f = tree.force_on_point(1, &points, params.charge, params.theta);

    // -charge * d / |d|², d = P - Q = (-300, 0, 0)
    let expected = params.charge / 300.0;
    assert!((f.x - expected).abs() < 1e-12, "got {:?}", f);
    assert_eq!(f.y, 0.0);
    assert_eq!(f.z, 0.0);
    assert_eq!(tree.nodes.len(), 1, "one body must not subdivide");
}

#[test]
fn fewer_than_two_points_builds_empty_tree() {
    let params = SimulationParameters::default();
    let mut points = make_points(&[[10.0, 20.0, 30.0]]);
    let mut rng = StdRng::seed_from_u64(1);

    let tree = OctTree::build(&[0], &mut points, &params, &mut rng);

    assert!(!tree.contains(0));
    assert_eq!(tree.nodes.len(), 1);
}

#[test]
fn aggregate_sums_mass_and_position() {
    let params = SimulationParameters::default();
    let mut points = scattered_points(10);
    let masters: Vec<usize> = (0..10).collect();
    let mut rng = StdRng::seed_from_u64(3);

    let tree = OctTree::build(&masters, &mut points, &params, &mut rng);
    let root = &tree.nodes[tree.root];

    let mean = points.iter().fold(NVec3::zeros(), |s, p| s + p.x) / 10.0;
    assert_eq!(root.mass, 10.0);
    assert!((root.center_of_mass() - mean).norm() < 1e-9);
    assert_eq!(tree.bodies().len(), 10);
}

#[test]
fn degenerate_root_escape_terminates_with_both_points() {
    // root diameter 10 is already below the separation of 25
    let params = SimulationParameters {
        sphere_radius: 5.0,
        minimum_body_separation: 25.0,
        ..Default::default()
    };
    let mut points = make_points(&[[1.0, 0.0, 0.0], [1.5, 0.0, 0.0]]);
    let mut rng = StdRng::seed_from_u64(11);

    let tree = OctTree::build(&[0, 1], &mut points, &params, &mut rng);

    assert!(tree.contains(0), "first point lost");
    assert!(tree.contains(1), "second point lost");
    assert!(tree.dropped().is_empty());
    assert!(tree.relocations() > 0);
    assert_eq!(tree.nodes[tree.root].mass, 2.0);
    for p in &points {
        assert!(p.x.iter().all(|c| c.is_finite() && c.abs() <= 5.0));
    }
}

#[test]
fn coincident_points_separate_through_escape_valve() {
    let params = SimulationParameters::default();
    let mut points = make_points(&[[300.0, 200.0, 100.0], [300.0, 200.0, 100.0], [300.0, 200.0, 100.0]]);
    let mut rng = StdRng::seed_from_u64(5);

    let tree = OctTree::build(&[0, 1, 2], &mut points, &params, &mut rng);

    assert_eq!(tree.bodies().len(), 3);
    assert!(tree.relocations() > 0);
    assert_ne!(points[0].x, points[1].x);
}

#[test]
fn escape_valve_pulls_occupant_inward_and_retries_newcomer() {
    // both fall into the same leaf once its diameter drops below 25
    let params = SimulationParameters::default();
    let occupant = NVec3::new(300.0, 200.0, 100.0);
    let newcomer = NVec3::new(300.0, 200.0, 100.5);
    let mut points = make_points(&[[300.0, 200.0, 100.0], [300.0, 200.0, 100.5]]);
    let mut rng = StdRng::seed_from_u64(5);

    let tree = OctTree::build(&[0, 1], &mut points, &params, &mut rng);

    assert!(tree.contains(0) && tree.contains(1));
    assert!(tree.dropped().is_empty());
    assert_eq!(tree.relocations(), 1);

    let expected_norm = occupant.norm() - params.minimum_body_separation;
    assert!((points[0].x.norm() - expected_norm).abs() < 1e-9, "occupant at {:?}", points[0].x);
    assert!((points[0].x.normalize() - occupant.normalize()).norm() < 1e-12, "occupant left its ray");
    assert_eq!(points[1].x, newcomer);
}

#[test]
fn exhausted_relocation_budget_leaves_points_out_of_the_tree() {
    // every octant of the root is below the separation and holds at most one point
    let params = SimulationParameters {
        sphere_radius: 5.0,
        minimum_body_separation: 25.0,
        ..Default::default()
    };
    let mut points = make_points(&[
        [3.0, 3.0, 3.0],
        [-3.0, 3.0, 3.0],
        [3.0, -3.0, 3.0],
        [-3.0, -3.0, 3.0],
        [3.0, 3.0, -3.0],
        [-3.0, 3.0, -3.0],
        [3.0, -3.0, -3.0],
        [-3.0, -3.0, -3.0],
        [1.0, 1.0, 1.0],
        [-1.0, 2.0, -2.0],
        [2.0, -1.0, 1.0],
        [-2.0, -2.0, 2.0],
    ]);
    let masters: Vec<usize> = (0..points.len()).collect();
    let mut rng = StdRng::seed_from_u64(7);

    let tree = OctTree::build(&masters, &mut points, &params, &mut rng);

    assert!(tree.bodies().len() <= 8);
    assert!(tree.dropped().len() >= 4);
    assert_eq!(tree.bodies().len() + tree.dropped().len(), 12);
    assert_eq!(tree.nodes[tree.root].mass, tree.bodies().len() as f64);

    // left out of the tree, yet still repelled by it
    for &d in tree.dropped() {
        assert!(!tree.contains(d));
        let f = tree.force_on_point(d, &points, params.charge, params.theta);
        assert!(f.iter().all(|c| c.is_finite()));
        assert!(f.norm() > 0.0, "dropped point {} feels no force", d);
    }

    // a full tick with the same geometry moves every point and stays finite
    let mut set = PointSet::new(points, Vec::new());
    let before = set.positions();
    let mut forces = ForceSet::new().with(BarnesHutRepulsion::seeded(7));
    euler_step(&mut set, &mut forces, &params);

    for (a, b) in before.iter().zip(set.positions()) {
        assert_ne!(*a, b, "point stayed at {:?}", a);
        assert!(b.iter().all(|c| c.is_finite() && c.abs() <= 4.0));
    }
}

#[test]
fn point_outside_root_is_relocated_onto_shell() {
    let params = SimulationParameters {
        sphere_radius: 100.0,
        ..Default::default()
    };
    let mut points = make_points(&[[500.0, 0.0, 0.0], [10.0, 10.0, 10.0]]);
    let mut rng = StdRng::seed_from_u64(9);

    let tree = OctTree::build(&[0, 1], &mut points, &params, &mut rng);

    assert!(tree.contains(0) && tree.contains(1));
    assert!(tree.relocations() >= 1);
    assert!((points[0].x.norm() - 95.0).abs() < 1e-9, "relocated to {:?}", points[0].x);
    assert_eq!(points[1].x, NVec3::new(10.0, 10.0, 10.0));
}

// ==================================================================================
// Spring tests
// ==================================================================================

#[test]
fn spring_at_rest_length_has_no_force() {
    let mut points = make_points(&[[0.0, 0.0, 0.0], [60.0, 80.0, 0.0]]);
    let link = Link::new(0, 1, &points);
    assert_eq!(link.rest_length(), 100.0);

    spring_force(&mut points, link.source, link.target, link.rest_length(), 5.0);

    assert_eq!(points[0].f, NVec3::zeros());
    assert_eq!(points[1].f, NVec3::zeros());
}

#[test]
fn stretched_spring_pulls_endpoints_together() {
    let mut points = make_points(&[[0.0, 0.0, 0.0], [100.0, 0.0, 0.0]]);
    let link = Link::new(0, 1, &points);
    points[1].x = NVec3::new(200.0, 0.0, 0.0);

    spring_force(&mut points, link.source, link.target, link.rest_length(), 5.0);

    // factor = (200 - 100) / 200 / 200 * 5, d = (-200, 0, 0)
    assert!((points[0].f.x - 2.5).abs() < 1e-12);
    assert!((points[1].f.x + 2.5).abs() < 1e-12);
    assert!((points[0].f + points[1].f).norm() < 1e-12);
}

#[test]
fn coincident_spring_endpoints_are_skipped() {
    let mut points = make_points(&[[5.0, 5.0, 5.0], [5.0, 5.0, 5.0]]);
    spring_force(&mut points, 0, 1, 50.0, 5.0);

    assert_eq!(points[0].f, NVec3::zeros());
    assert_eq!(points[1].f, NVec3::zeros());
}

#[test]
fn link_resolves_endpoints_to_masters() {
    let mut points = make_points(&[[0.0, 0.0, 0.0], [0.0, 0.0, 0.0], [30.0, 40.0, 0.0]]);
    points[1].master = Some(0);

    let link = Link::new(1, 2, &points);

    assert_eq!(link.source, 0);
    assert_eq!(link.target, 2);
    assert_eq!(link.rest_length(), 50.0);
}

// ==================================================================================
// Integrator tests
// ==================================================================================

#[test]
fn clamp_is_per_axis_not_radial() {
    let r = 1200.0;
    let mut p = Point::new(0, NVec3::new(r, 0.0, 0.0));
    scale_to_be_in_sphere(&mut p, r);
    assert_eq!(p.x, NVec3::new(r - 1.0, 0.0, 0.0));

    // a cube corner is far outside the ball but stays put
    let mut corner = Point::new(1, NVec3::new(1100.0, 1100.0, -1100.0));
    scale_to_be_in_sphere(&mut corner, r);
    assert_eq!(corner.x, NVec3::new(1100.0, 1100.0, -1100.0));

    let mut far = Point::new(2, NVec3::new(-5000.0, 3.0, 5000.0));
    scale_to_be_in_sphere(&mut far, r);
    assert_eq!(far.x, NVec3::new(1.0 - r, 3.0, r - 1.0));
}

#[test]
fn apply_then_reset_moves_by_force_once() {
    let mut p = Point::new(0, NVec3::new(1.0, 2.0, 3.0));
    p.f = NVec3::new(0.5, -1.0, 2.0);

    apply_forces(&mut p);
    reset_forces(&mut p);

    assert_eq!(p.x, NVec3::new(1.5, 1.0, 5.0));
    assert_eq!(p.f, NVec3::zeros());
}

// ==================================================================================
// Topology tests
// ==================================================================================

#[test]
fn sphere_mesh_layout() {
    let mesh = SphereMesh::new(600.0, 8, 10);

    assert_eq!(mesh.vertices.len(), 9 * 11);
    assert_eq!(mesh.faces.len(), 2 * 8 * 9);
    assert_eq!(mesh.vertices[0].y, 600.0);
    assert_eq!(mesh.vertices[mesh.vertices.len() - 1].y, -600.0);
    for v in &mesh.vertices {
        assert!((v.norm() - 600.0).abs() < 1e-9);
    }
}

#[test]
fn topology_merges_poles_and_seam() {
    let mesh = SphereMesh::new(100.0, 4, 3);
    let set = build_from_mesh(&mesh.vertices, &mesh.faces, 4, 3).expect("valid mesh");

    assert_eq!(set.len(), 20);
    for k in 1..=4 {
        assert_eq!(set.points[k].master, Some(0));
        assert_eq!(set.points[19 - k].master, Some(19));
    }
    assert_eq!(set.points[9].master, Some(5));
    assert_eq!(set.points[14].master, Some(10));
    assert_eq!(set.masters().len(), 10);
    for (i, p) in set.points.iter().enumerate() {
        assert_eq!(p.id, i);
    }
}

#[test]
fn topology_links_close_last_row() {
    let mesh = SphereMesh::new(100.0, 4, 3);
    let set = build_from_mesh(&mesh.vertices, &mesh.faces, 4, 3).expect("valid mesh");

    assert_eq!(set.links.len(), mesh.faces.len() + 4);
    for link in &set.links {
        assert!(set.points[link.source].is_master());
        assert!(set.points[link.target].is_master());
        assert_eq!(link.rest_length(), link.length(&set.points));
    }
}

#[test]
fn topology_rejects_malformed_meshes() {
    let mesh = SphereMesh::new(100.0, 4, 3);

    assert_eq!(
        build_from_mesh(&mesh.vertices, &mesh.faces, 0, 3).unwrap_err(),
        TopologyError::NoSegments { width: 0, height: 3 }
    );
    assert_eq!(
        build_from_mesh(&mesh.vertices[..10], &mesh.faces, 4, 3).unwrap_err(),
        TopologyError::VertexCount {
            expected: 20,
            actual: 10,
            width: 4,
            height: 3
        }
    );

    let mut faces = mesh.faces.clone();
    faces[2].c = 99;
    assert_eq!(
        build_from_mesh(&mesh.vertices, &faces, 4, 3).unwrap_err(),
        TopologyError::FaceIndex {
            face: 2,
            vertex: 99,
            count: 20
        }
    );
}

// ==================================================================================
// Simulator tests
// ==================================================================================

#[test]
fn paused_steps_leave_positions_untouched() {
    let mut sim = melon_simulator(8, 10);
    sim.frame(5);

    sim.params_mut().run_simulation = false;
    let before = sim.read_positions();
    let ticks = sim.ticks();

    for _ in 0..10 {
        sim.step();
    }

    assert_eq!(sim.read_positions(), before);
    assert_eq!(sim.ticks(), ticks);
}

#[test]
fn hundred_ticks_stay_in_box_and_slaves_follow() {
    let mut sim = melon_simulator(8, 10);
    let r = sim.params().sphere_radius;

    for _ in 0..100 {
        sim.step();

        for x in sim.read_positions() {
            assert!(x.iter().all(|c| c.is_finite() && c.abs() <= r), "escaped: {:?}", x);
        }
        assert_slaves_mirror_masters(&sim);
    }
    assert_eq!(sim.ticks(), 100);
}

#[test]
fn shrinking_the_sphere_applies_next_tick() {
    let mut sim = melon_simulator(8, 10);
    sim.params_mut().sphere_radius = 300.0;

    sim.step();

    for x in sim.read_positions() {
        assert!(x.iter().all(|c| c.abs() <= 299.0), "not clamped: {:?}", x);
    }
    assert_slaves_mirror_masters(&sim);
}

#[test]
fn zero_theta_tick_matches_direct_tick() {
    let mesh = SphereMesh::new(600.0, 8, 10);
    let params = SimulationParameters {
        theta: 0.0,
        ..Default::default()
    };

    let mut bh = Simulator::from_mesh(&mesh, params.clone(), 42).expect("valid mesh");
    let set = build_from_mesh(&mesh.vertices, &mesh.faces, 8, 10).expect("valid mesh");
    let forces = ForceSet::new().with(DirectRepulsion).with(SpringLinks);
    let mut direct = Simulator::with_forces(set, params, forces);

    bh.step();
    direct.step();

    for (a, b) in bh.read_positions().iter().zip(direct.read_positions()) {
        assert!((a - b).norm() < 1e-6, "{:?} vs {:?}", a, b);
    }
}

#[test]
fn lone_point_does_not_move() {
    let set = PointSet::new(make_points(&[[10.0, 20.0, 30.0]]), Vec::new());
    let mut sim = Simulator::new(set, SimulationParameters::default(), 0);

    sim.frame(3);

    assert_eq!(sim.read_positions(), vec![NVec3::new(10.0, 20.0, 30.0)]);
    assert_eq!(sim.ticks(), 3);
}

// ==================================================================================
// Scenario tests
// ==================================================================================

#[test]
fn scenario_yaml_fills_defaults() {
    let yaml = "simulation:\n  charge: 80.0\nmesh:\n  width_segments: 12\n";
    let cfg: ScenarioConfig = serde_yaml::from_str(yaml).expect("valid yaml");

    assert_eq!(cfg.simulation.charge, 80.0);
    assert_eq!(cfg.simulation.theta, 0.6);
    assert_eq!(cfg.mesh.width_segments, 12);
    assert_eq!(cfg.mesh.height_segments, 16);
    assert_eq!(cfg.run.steps_per_frame, 3);
    assert!(cfg.validate().is_ok());
}

#[test]
fn scenario_validation_rejects_bad_values() {
    let mut cfg = ScenarioConfig::default();
    cfg.simulation.theta = -1.0;
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::Negative {
            field: "theta",
            value: -1.0
        })
    );

    let mut cfg = ScenarioConfig::default();
    cfg.simulation.minimum_body_separation = 0.0;
    assert_eq!(
        cfg.validate(),
        Err(ConfigError::NotPositive {
            field: "minimum_body_separation",
            value: 0.0
        })
    );

    let mut cfg = ScenarioConfig::default();
    cfg.mesh.radius = 2000.0;
    assert!(matches!(cfg.validate(), Err(ConfigError::MeshOutsideSphere { .. })));

    let mut cfg = ScenarioConfig::default();
    cfg.mesh.height_segments = 1;
    assert!(matches!(cfg.validate(), Err(ConfigError::MeshTooCoarse { .. })));
}

#[test]
fn scenario_accepts_exact_theta() {
    let mut cfg = ScenarioConfig::default();
    cfg.simulation.theta = 0.0;
    assert!(cfg.validate().is_ok());
}

#[test]
fn scenario_runs_all_frames() {
    let mut cfg = ScenarioConfig::default();
    cfg.mesh.width_segments = 8;
    cfg.mesh.height_segments = 6;
    cfg.run.frames = 2;

    let mut scenario = Scenario::build_scenario(cfg).expect("valid scenario");
    let summary = scenario.run();

    assert_eq!(summary.ticks, 6);
    assert_eq!(summary.points, 9 * 7);
    assert!(summary.max_coordinate <= 1199.0);
    assert!(summary.mean_radius > 0.0);
}
