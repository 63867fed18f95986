//! # Barnes–Hut Octree
//!
//! This module implements the **octree** used to approximate the repulsion
//! between all points of the melon mesh. It replaces the naive `O(N²)`
//! all-pairs sum with an approximate `O(N log N)` traversal.
//!
//! ## Core Concepts
//!
//! - The root covers the cube `[-R, R]³` where `R` is the current sphere radius.
//! - A node is either empty, a leaf holding exactly one point, or a parent
//!   with exactly 8 children (octants).
//! - Each node stores:
//!   - aggregate mass (every point weighs 1)
//!   - mass-weighted position sum (center of mass = sum / mass)
//!   - bounding box and mean extent (`diameter`)
//!
//! ## Two-phase protocol
//!
//! 1. Insert every point ([`OctTree::insert`]), then
//! 2. call [`OctTree::aggregate`] once before any force query.
//!
//! Aggregates are only valid after step 2. The tree is thrown away at the end
//! of every tick.
//!
//! ## Degenerate regions
//!
//! Two points closer than the minimum body separation would otherwise make the
//! tree subdivide without end. A leaf whose diameter is already below that
//! threshold never subdivides. Instead its occupant is pulled toward the origin
//! and both points are inserted again from the root. Points that fit no child
//! at all are moved to a random spot on the sphere of radius `0.95 R`.
//! Both moves count against a per-tree relocation budget. A point that would
//! exceed the budget is left out of the tree for this tick.

use std::f64::consts::PI;

use log::warn;
use rand::Rng;

use crate::simulation::params::SimulationParameters;
use crate::simulation::states::{NVec3, Point};

/// Floor for distances used as denominators
pub const DISTANCE_EPSILON: f64 = 1e-6;

/// Internal nodes lighter than this carry no contribution
const MIN_AGGREGATE_MASS: f64 = 0.01;

/// Random relocation targets lie on the sphere of this fraction of `R`
const RELOCATION_RADIUS_FRACTION: f64 = 0.95;

/// Relocations allowed per inserted body
const RELOCATIONS_PER_BODY: usize = 64;

/// A single octree node.
///
/// Each node represents an axis-aligned box that may contain:
/// - zero points (empty leaf)
/// - exactly one point (`body = Some(i)`, `children = None`)
/// - any number of points below it (`children = Some(..)`, `body = None`)
#[derive(Debug, Clone)]
pub struct OctNode {
    pub bbox_min: NVec3,
    pub bbox_max: NVec3,
    pub diameter: f64, // mean of the three box extents
    pub mass: f64,
    pub mass_position: NVec3, // sum of positions weighted by mass
    pub children: Option<[usize; 8]>, // indices into OctTree::nodes
    pub body: Option<usize>, // Some(i) if this leaf holds point i
}

impl OctNode {
    fn new(bbox_min: NVec3, bbox_max: NVec3) -> Self {
        let extent = bbox_max - bbox_min;
        Self {
            bbox_min,
            bbox_max,
            diameter: (extent.x + extent.y + extent.z) / 3.0,
            mass: 0.0,
            mass_position: NVec3::zeros(),
            children: None,
            body: None,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.body.is_some()
    }

    pub fn is_parent(&self) -> bool {
        self.children.is_some()
    }

    /// True if `p` lies inside the closed box of this node.
    pub fn is_fitting(&self, p: &NVec3) -> bool {
        p.x >= self.bbox_min.x
            && p.x <= self.bbox_max.x
            && p.y >= self.bbox_min.y
            && p.y <= self.bbox_max.y
            && p.z >= self.bbox_min.z
            && p.z <= self.bbox_max.z
    }

    /// Center of mass. Only meaningful after [`OctTree::aggregate`] and for
    /// nodes with non-zero mass.
    pub fn center_of_mass(&self) -> NVec3 {
        self.mass_position / self.mass
    }

    fn clear(&mut self) {
        self.body = None;
        self.mass = 0.0;
        self.mass_position = NVec3::zeros();
    }
}

/// Octree over the master points of one tick.
///
/// This structure owns:
/// - a vector of all nodes (`nodes`), children are always pushed after
///   their parent so every child handle is larger than its parent's
/// - the index of the root (`root`)
/// - the thresholds captured from [`SimulationParameters`] at construction
pub struct OctTree {
    pub nodes: Vec<OctNode>,
    pub root: usize,
    minimum_body_separation: f64,
    sphere_radius: f64,
    relocations: usize,
    relocation_budget: usize,
    dropped: Vec<usize>,
}

impl OctTree {
    /// Create an empty tree whose root covers `[-R, R]³`.
    pub fn new(params: &SimulationParameters) -> Self {
        let size = params.sphere_radius;
        let root = OctNode::new(NVec3::new(-size, -size, -size), NVec3::new(size, size, size));

        Self {
            nodes: vec![root],
            root: 0,
            minimum_body_separation: params.minimum_body_separation,
            sphere_radius: params.sphere_radius,
            relocations: 0,
            relocation_budget: 0,
            dropped: Vec::new(),
        }
    }

    /// Build a tree from the given point indices and aggregate it.
    ///
    /// With fewer than two bodies nothing is inserted: there is no pair to
    /// compute a force for.
    ///
    /// # Parameters
    /// - `bodies`: indices into `points` to insert (masters only).
    /// - `points`: the point arena. Positions may be moved by relocation.
    /// - `params`: current simulation parameters.
    /// - `rng`   : source for random relocation targets.
    pub fn build<R: Rng>(
        bodies: &[usize],
        points: &mut [Point],
        params: &SimulationParameters,
        rng: &mut R,
    ) -> Self {
        let mut tree = Self::new(params);
        if bodies.len() < 2 {
            return tree;
        }

        for &b in bodies {
            tree.insert(b, points, rng);
        }
        tree.aggregate(points);

        tree
    }

    /// Number of relocations (escape valve and random) performed so far
    pub fn relocations(&self) -> usize {
        self.relocations
    }

    /// Points left out of the tree because the relocation budget ran out
    pub fn dropped(&self) -> &[usize] {
        &self.dropped
    }

    /// All point indices currently stored in a leaf
    pub fn bodies(&self) -> Vec<usize> {
        self.nodes.iter().filter_map(|n| n.body).collect()
    }

    pub fn contains(&self, body: usize) -> bool {
        self.nodes.iter().any(|n| n.body == Some(body))
    }

    /// Insert point `body` into the tree.
    ///
    /// The walk is iterative. Points that have to be moved (occupants pulled
    /// out of a degenerate leaf, points fitting no child) go onto a pending
    /// stack and are inserted again from the root. An occupant is always
    /// pushed after the point that displaced it, so it is re-inserted first.
    ///
    /// # Parameters
    /// - `body`  : index of the point in `points`.
    /// - `points`: the point arena. Relocated points get new positions.
    /// - `rng`   : source for random relocation targets.
    pub fn insert<R: Rng>(&mut self, body: usize, points: &mut [Point], rng: &mut R) {
        self.relocation_budget += RELOCATIONS_PER_BODY;

        let mut pending = vec![body];
        while let Some(b) = pending.pop() {
            self.insert_from_root(b, points, rng, &mut pending);
        }
    }

    /// Compute aggregate mass and mass-weighted position for every node.
    ///
    /// Leaves holding a point get mass 1 and that point's position. Parents
    /// sum their children. Empty nodes end up with zero.
    ///
    /// This is a post-order pass. Since every child handle is larger than its
    /// parent's, sweeping the arena backwards visits children first.
    pub fn aggregate(&mut self, points: &[Point]) {
        for idx in (0..self.nodes.len()).rev() {
            let (mass, mass_position) = match (self.nodes[idx].children, self.nodes[idx].body) {
                (Some(children), _) => children.iter().fold((0.0, NVec3::zeros()), |(m, s), &c| {
                    (m + self.nodes[c].mass, s + self.nodes[c].mass_position)
                }),
                (None, Some(b)) => (1.0, points[b].x),
                (None, None) => (0.0, NVec3::zeros()),
            };

            let node = &mut self.nodes[idx];
            node.mass = mass;
            node.mass_position = mass_position;
        }
    }

    /// Approximate repulsion on point `i` from every other point in the tree.
    ///
    /// For each visited node:
    ///
    /// - **Empty** (no point and mass ~0): no contribution.
    /// - **The point itself**: skipped.
    /// - **Leaf with a point**: exact pairwise term.
    /// - **Parent** with `diameter / distance < theta`: the whole subtree acts
    ///   as one body of its aggregate mass at its center of mass.
    /// - **Parent** otherwise: visit all 8 children.
    ///
    /// The pairwise law is `-charge * mass * d / max(|d|, 1e-6)²` where `d`
    /// points from the queried point toward the node.
    ///
    /// # Parameters
    /// - `i`     : index of the point to evaluate.
    /// - `points`: the point arena.
    /// - `charge`: repulsion strength.
    /// - `theta` : opening threshold controlling accuracy vs. speed.
    pub fn force_on_point(&self, i: usize, points: &[Point], charge: f64, theta: f64) -> NVec3 {
        let pos = points[i].x;
        let mut force = NVec3::zeros();
        let mut stack = vec![self.root];

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];

            if node.body == Some(i) {
                continue; // don't self-interact
            }
            if !node.is_filled() && node.mass <= MIN_AGGREGATE_MASS {
                continue;
            }

            let (d, mass) = match node.body {
                Some(b) => (points[b].x - pos, 1.0),
                None => (node.center_of_mass() - pos, node.mass),
            };

            let radius = d.norm();
            let radius_squared = radius.max(DISTANCE_EPSILON).powi(2);
            let treat_as_single_body = node.diameter / radius < theta;

            if node.is_filled() || treat_as_single_body {
                force -= d * (charge * mass / radius_squared);
            } else if let Some(children) = node.children {
                stack.extend(children);
            }
        }

        force
    }

    /// Add the approximate repulsion on point `i` to its force accumulator.
    pub fn accumulate_force_on(&self, i: usize, points: &mut [Point], params: &SimulationParameters) {
        let force = self.force_on_point(i, points, params.charge, params.theta);
        points[i].f += force;
    }

    // helpers ==============================================================================

    /// Walk down from the root with point `body` until it is stored, or until
    /// it (or a displaced occupant) has been queued on `pending`.
    fn insert_from_root<R: Rng>(
        &mut self,
        body: usize,
        points: &mut [Point],
        rng: &mut R,
        pending: &mut Vec<usize>,
    ) {
        let mut node_idx = self.root;

        loop {
            let node = &self.nodes[node_idx];

            // Case 1: empty leaf -> store here
            if !node.is_filled() && !node.is_parent() {
                self.store(node_idx, body, points);
                return;
            }

            // Case 2: occupied leaf too small to split -> escape valve.
            // The root is exempt, its occupant would only come straight back.
            if let (Some(occupant), None) = (node.body, node.children) {
                if node.diameter < self.minimum_body_separation && node_idx != self.root {
                    if !self.spend_relocation(body, points) {
                        return;
                    }
                    self.nodes[node_idx].clear();
                    self.pull_toward_origin(occupant, points, rng);

                    pending.push(body);
                    pending.push(occupant);
                    return;
                }
            }

            // Case 3: occupied leaf -> subdivide and move the occupant down
            if let Some(occupant) = self.nodes[node_idx].body {
                self.nodes[node_idx].clear();
                self.subdivide(node_idx);

                match self.fitting_child(node_idx, &points[occupant].x) {
                    Some(child) => self.store(child, occupant, points),
                    None => {
                        if self.relocate_randomly(occupant, points, rng) {
                            pending.push(occupant);
                        }
                    }
                }
            }

            // Case 4: parent -> descend into the first child that fits
            match self.fitting_child(node_idx, &points[body].x) {
                Some(child) => node_idx = child,
                None => {
                    if self.relocate_randomly(body, points, rng) {
                        pending.push(body);
                    }
                    return;
                }
            }
        }
    }

    fn store(&mut self, node_idx: usize, body: usize, points: &[Point]) {
        let node = &mut self.nodes[node_idx];
        node.body = Some(body);
        node.mass = 1.0;
        node.mass_position = points[body].x;
    }

    /// Split a leaf into 8 octants.
    ///
    /// Octant `k` takes the upper half of the x axis if bit 0 of `k` is set,
    /// of y for bit 1 and of z for bit 2.
    fn subdivide(&mut self, node_idx: usize) {
        let lo = self.nodes[node_idx].bbox_min;
        let hi = self.nodes[node_idx].bbox_max;
        let mid = (lo + hi) * 0.5;

        let mut children = [0; 8];
        for (octant, slot) in children.iter_mut().enumerate() {
            let upper = |axis: usize| octant & (1 << axis) != 0;
            let cmin = NVec3::from_fn(|axis, _| if upper(axis) { mid[axis] } else { lo[axis] });
            let cmax = NVec3::from_fn(|axis, _| if upper(axis) { hi[axis] } else { mid[axis] });

            *slot = self.nodes.len();
            self.nodes.push(OctNode::new(cmin, cmax));
        }
        self.nodes[node_idx].children = Some(children);
    }

    /// First child whose closed box contains `p`. Boundary points go to the
    /// lowest-indexed matching child; NaN or out-of-box points match none.
    fn fitting_child(&self, node_idx: usize, p: &NVec3) -> Option<usize> {
        let children = self.nodes[node_idx].children?;
        children.into_iter().find(|&c| self.nodes[c].is_fitting(p))
    }

    /// Count one relocation against the budget. Returns false and drops
    /// `body` from this tree once the budget is spent.
    fn spend_relocation(&mut self, body: usize, points: &[Point]) -> bool {
        if self.relocations >= self.relocation_budget {
            warn!(
                "octree relocation budget ({}) exhausted, point {} left out of this tick",
                self.relocation_budget, points[body].id
            );
            self.dropped.push(body);
            return false;
        }
        self.relocations += 1;
        true
    }

    /// Shrink the radius of `body` by the minimum separation. A point already
    /// that close to the origin cannot shrink and is moved randomly instead.
    fn pull_toward_origin<R: Rng>(&self, body: usize, points: &mut [Point], rng: &mut R) {
        let x = points[body].x;
        let radius = x.norm();

        if radius > self.minimum_body_separation {
            points[body].x = x * ((radius - self.minimum_body_separation) / radius);
        } else {
            points[body].x = random_shell_position(self.sphere_radius, rng);
        }
    }

    fn relocate_randomly<R: Rng>(&mut self, body: usize, points: &mut [Point], rng: &mut R) -> bool {
        if !self.spend_relocation(body, points) {
            return false;
        }

        warn!(
            "point {} at ({:.3}, {:.3}, {:.3}) fits no octant, relocating",
            points[body].id, points[body].x.x, points[body].x.y, points[body].x.z
        );
        points[body].x = random_shell_position(self.sphere_radius, rng);
        true
    }
}

// helpers ===========================================================================

/// Random point on the sphere of radius `0.95 * sphere_radius`.
///
/// Uses two uniform angles, so targets cluster slightly toward the poles.
/// Relocation only needs a spot well inside the root box.
pub fn random_shell_position<R: Rng>(sphere_radius: f64, rng: &mut R) -> NVec3 {
    let gamma = 2.0 * PI * rng.random::<f64>();
    let delta = PI * rng.random::<f64>();
    let radius = sphere_radius * RELOCATION_RADIUS_FRACTION;

    NVec3::new(
        radius * delta.sin() * gamma.cos(),
        radius * delta.sin() * gamma.sin(),
        radius * delta.cos(),
    )
}
