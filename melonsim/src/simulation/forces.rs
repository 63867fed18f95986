//! Force contributors for the melon simulation
//!
//! Every term adds into the per-point force accumulators of the master
//! points. Terms run in registration order inside a [`ForceSet`]:
//! - [`BarnesHutRepulsion`] octree-approximated repulsion (the force field)
//! - [`DirectRepulsion`]    exact O(n²) repulsion, same law, for reference
//! - [`SpringLinks`]        spring network over the mesh links

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::simulation::barnes_hut::{OctTree, DISTANCE_EPSILON};
use crate::simulation::params::SimulationParameters;
use crate::simulation::states::{Point, PointSet};

/// Collection of force terms (repulsion, springs, etc)
/// Each term implements [`ForceTerm`]; contributions are summed into the
/// force accumulator of every master point
pub struct ForceSet {
    terms: Vec<Box<dyn ForceTerm + Send + Sync>>,
}

impl ForceSet {
    /// Constructor
    pub fn new() -> Self {
        Self {
            terms: Vec::new(),
        }
    }

    /// Add a force term
    pub fn with(mut self, term: impl ForceTerm + Send + Sync + 'static) -> Self {
        self.terms.push(Box::new(term));
        self
    }

    /// Run every term in order. Accumulators are not zeroed here, the
    /// integrator resets them after moving the points.
    pub fn accumulate_forces(&mut self, params: &SimulationParameters, set: &mut PointSet, masters: &[usize]) {
        for term in self.terms.iter_mut() {
            term.accumulate(params, set, masters);
        }
    }
}

impl Default for ForceSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for force sources operating on a [`PointSet`]
/// Implementations add their contribution into `set.points[i].f` for the
/// masters `i` they affect
pub trait ForceTerm {
    fn accumulate(&mut self, params: &SimulationParameters, set: &mut PointSet, masters: &[usize]);
}

// =========================================================================================
// Repulsion
// =========================================================================================

/// Repulsion evaluated via a fresh Barnes–Hut octree every tick
/// The rng only feeds the octree's relocation fallback; seeding it makes a
/// run reproducible
pub struct BarnesHutRepulsion {
    rng: StdRng,
}

impl BarnesHutRepulsion {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl ForceTerm for BarnesHutRepulsion {
    /// Build the tree over `masters`, aggregate, then query it once per master
    fn accumulate(&mut self, params: &SimulationParameters, set: &mut PointSet, masters: &[usize]) {
        if masters.len() < 2 {
            return;
        }

        let tree = OctTree::build(masters, &mut set.points, params, &mut self.rng);
        for &i in masters {
            tree.accumulate_force_on(i, &mut set.points, params);
        }
    }
}

/// Exact repulsion over every unordered pair of masters
/// Same law as the tree: `f_i -= charge * d / max(|d|, eps)²`, `d = x_j - x_i`
pub struct DirectRepulsion;

impl ForceTerm for DirectRepulsion {
    fn accumulate(&mut self, params: &SimulationParameters, set: &mut PointSet, masters: &[usize]) {
        direct_repulsion(&mut set.points, masters, params.charge);
    }
}

/// Loop over each unordered pair (i, j) and apply the repulsion to both
pub fn direct_repulsion(points: &mut [Point], masters: &[usize], charge: f64) {
    for (k, &i) in masters.iter().enumerate() {
        for &j in &masters[k + 1..] {
            // d points from i to j; i is pushed along -d, j along +d
            let d = points[j].x - points[i].x;
            let radius_squared = d.norm().max(DISTANCE_EPSILON).powi(2);
            let f = d * (charge / radius_squared);

            points[i].f -= f;
            points[j].f += f;
        }
    }
}

// =========================================================================================
// Springs
// =========================================================================================

/// Each link acts as a simple spring pinned at its rest length
pub struct SpringLinks;

impl ForceTerm for SpringLinks {
    fn accumulate(&mut self, params: &SimulationParameters, set: &mut PointSet, _masters: &[usize]) {
        let PointSet { points, links } = set;
        for link in links.iter() {
            spring_force(points.as_mut_slice(), link.source, link.target, link.rest_length(), params.spring_constant);
        }
    }
}

/// Add the spring force of one link to both endpoints.
/// Coincident endpoints (closer than 1e-6) contribute nothing.
pub fn spring_force(points: &mut [Point], source: usize, target: usize, rest_length: f64, spring_constant: f64) {
    let d = points[source].x - points[target].x;
    let radius = d.norm();
    if radius <= DISTANCE_EPSILON {
        return;
    }

    let factor = (radius - rest_length) / radius / radius * spring_constant;
    points[source].f -= d * factor;
    points[target].f += d * factor;
}
