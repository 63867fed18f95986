//! Runtime parameters for the melon simulation
//!
//! `SimulationParameters` is the block the host UI writes between ticks:
//! - run/pause flag,
//! - bounding sphere radius (also the octree root half-extent),
//! - minimum body separation (octree escape-valve threshold),
//! - repulsion charge, Barnes–Hut theta and spring constant
//!
//! Every component receives it by reference at the start of a tick.

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParameters {
    pub run_simulation: bool, // false = step() is a no-op
    pub sphere_radius: f64, // bounding domain, octree root is [-R, R]^3
    pub minimum_body_separation: f64, // nodes smaller than this never subdivide
    pub charge: f64, // repulsion strength
    pub theta: f64, // opening threshold, node approximated when diameter / distance < theta
    pub spring_constant: f64, // link stiffness
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            run_simulation: true,
            sphere_radius: 1200.0,
            minimum_body_separation: 25.0,
            charge: 30.0,
            theta: 0.6,
            spring_constant: 5.0,
        }
    }
}
