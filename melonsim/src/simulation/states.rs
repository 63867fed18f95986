//! Core state types for the melon simulation.
//!
//! Defines the point arena and the spring links between points:
//! - `Point`    one mass particle (position, accumulated force, optional master)
//! - `Link`     spring constraint between two master points
//! - `PointSet` owns all points and links of one simulated mesh
//!
//! Slaves refer to their master by arena index only; they are derived copies
//! and never take part in force accumulation.

use nalgebra::Vector3;
pub type NVec3 = Vector3<f64>;

#[derive(Debug, Clone)]
pub struct Point {
    pub id: usize, // vertex index in the source mesh
    pub x: NVec3, // position
    pub f: NVec3, // force accumulated during the current tick
    pub master: Option<usize>, // Some(i) if this point mirrors point i
}

impl Point {
    pub fn new(id: usize, x: NVec3) -> Self {
        Self {
            id,
            x,
            f: NVec3::zeros(),
            master: None,
        }
    }

    pub fn is_master(&self) -> bool {
        self.master.is_none()
    }
}

/// Spring between two master points.
///
/// Both endpoints are resolved to their masters when the link is created and
/// the rest length is measured from those resolved positions. The rest length
/// never changes afterwards.
#[derive(Debug, Clone)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    rest_length: f64,
}

impl Link {
    /// Create a link between `source` and `target`, resolving both to masters.
    pub fn new(source: usize, target: usize, points: &[Point]) -> Self {
        let source = points[source].master.unwrap_or(source);
        let target = points[target].master.unwrap_or(target);
        let rest_length = (points[source].x - points[target].x).norm();

        Self {
            source,
            target,
            rest_length,
        }
    }

    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }

    /// Current distance between the two endpoints
    pub fn length(&self, points: &[Point]) -> f64 {
        (points[self.source].x - points[self.target].x).norm()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointSet {
    pub points: Vec<Point>, // every mesh vertex, indexed by id
    pub links: Vec<Link>, // springs, endpoints always masters
}

impl PointSet {
    pub fn new(points: Vec<Point>, links: Vec<Link>) -> Self {
        Self { points, links }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of all independent points, in id order
    pub fn masters(&self) -> Vec<usize> {
        self.points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_master())
            .map(|(i, _)| i)
            .collect()
    }

    /// Copy each master's position onto its slaves
    pub fn sync_slaves(&mut self) {
        for i in 0..self.points.len() {
            if let Some(m) = self.points[i].master {
                self.points[i].x = self.points[m].x;
            }
        }
    }

    pub fn positions(&self) -> Vec<NVec3> {
        self.points.iter().map(|p| p.x).collect()
    }
}
