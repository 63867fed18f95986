use std::time::Instant;

use crate::mesh::sphere::SphereMesh;
use crate::simulation::engine::Simulator;
use crate::simulation::forces::{BarnesHutRepulsion, DirectRepulsion, ForceTerm};
use crate::simulation::params::SimulationParameters;
use crate::simulation::states::{NVec3, Point, PointSet};

/// Helper to build a point set of size `n` spread through the sphere
fn make_point_set(n: usize, radius: f64) -> PointSet {
    let points = (0..n)
        .map(|i| {
            let i_f = i as f64;
            // deterministic positions, no rand needed
            let x = NVec3::new(
                (i_f * 0.37).sin() * radius,
                (i_f * 0.13).cos() * radius,
                (i_f * 0.07).sin() * radius,
            );
            Point::new(i, x)
        })
        .collect();

    PointSet::new(points, Vec::new())
}

/// Time one repulsion pass, direct vs Barnes–Hut, for growing n
pub fn bench_repulsion() {
    let ns = [200, 400, 800, 1600, 3200, 6400];
    let params = SimulationParameters::default();

    for n in ns {
        let template = make_point_set(n, params.sphere_radius * 0.5);
        let masters: Vec<usize> = (0..n).collect();

        let mut direct = DirectRepulsion;
        let mut bh = BarnesHutRepulsion::seeded(42);

        // Warm up
        direct.accumulate(&params, &mut template.clone(), &masters);
        bh.accumulate(&params, &mut template.clone(), &masters);

        // Time direct
        let mut set = template.clone();
        let t0 = Instant::now();
        direct.accumulate(&params, &mut set, &masters);
        let dt_direct = t0.elapsed().as_secs_f64();

        // Time barnes-hut
        let mut set = template.clone();
        let t1 = Instant::now();
        bh.accumulate(&params, &mut set, &masters);
        let dt_bh = t1.elapsed().as_secs_f64();

        println!("N = {n:5}, direct = {:8.6} s, BH = {:8.6} s", dt_direct, dt_bh);
    }
}

/// Time full ticks on sphere meshes of growing resolution
/// Paste output directly into a spreadsheet to graph
pub fn bench_tick_curve() {
    println!("segments,points,tick_ms");

    for segments in (8..=64).step_by(8) {
        let mesh = SphereMesh::new(600.0, segments, segments);
        let Ok(mut sim) = Simulator::from_mesh(&mesh, SimulationParameters::default(), 42) else {
            continue;
        };

        // Small meshes: average over more ticks to smooth noise
        let ticks = if segments <= 32 { 30 } else { 5 };

        sim.step(); // warm up
        let t0 = Instant::now();
        sim.frame(ticks);
        let ms = t0.elapsed().as_secs_f64() * 1000.0 / ticks as f64;

        println!("{},{},{:.6}", segments, sim.points().len(), ms);
    }
}
