//! Fixed unit-step integrator for the melon simulation
//!
//! Explicit, mass-less Euler: the accumulated force of a tick is the
//! displacement of that tick. There is no velocity state.
//!
//! Order of one tick (must be kept):
//! 1. collect masters
//! 2. repulsion (octree)
//! 3. springs, on top of the repulsion
//! 4. for each master: apply, clamp, reset
//! 5. copy master positions onto slaves

use super::forces::ForceSet;
use super::params::SimulationParameters;
use super::states::{NVec3, Point, PointSet};

/// Move the point by its accumulated force
pub fn apply_forces(p: &mut Point) {
    p.x += p.f;
}

/// Clamp every coordinate to `[1 - R, R - 1]`.
///
/// This keeps points inside the cube around the sphere, not inside the sphere
/// itself. Points outside the octree root would be relocated on the next
/// tick. Written as max-then-min so that `R < 1` (inverted bounds) cannot
/// panic the way `f64::clamp` would.
pub fn scale_to_be_in_sphere(p: &mut Point, sphere_radius: f64) {
    let lo = 1.0 - sphere_radius;
    let hi = sphere_radius - 1.0;
    p.x = p.x.map(|c| c.max(lo).min(hi));
}

pub fn reset_forces(p: &mut Point) {
    p.f = NVec3::zeros();
}

/// Advance the point set by one tick.
/// Accumulates all forces of `forces` on the masters, moves and clamps them,
/// zeroes the accumulators and finally mirrors masters onto slaves
pub fn euler_step(set: &mut PointSet, forces: &mut ForceSet, params: &SimulationParameters) {
    let masters = set.masters();
    if masters.is_empty() { // nothing to move
        return;
    }

    forces.accumulate_forces(params, set, &masters);

    for &i in &masters {
        let p = &mut set.points[i];
        apply_forces(p);
        scale_to_be_in_sphere(p, params.sphere_radius);
        reset_forces(p);
    }

    set.sync_slaves();
}
