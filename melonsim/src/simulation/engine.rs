//! Simulator facade used by a host render loop
//!
//! Owns the point set, the force terms and the parameter block. The host
//! calls `step`/`frame` from its animation callback and pushes
//! `read_positions` into its own geometry buffer.

use log::debug;

use crate::mesh::sphere::SphereMesh;
use crate::simulation::forces::{BarnesHutRepulsion, ForceSet, SpringLinks};
use crate::simulation::integrator::euler_step;
use crate::simulation::params::SimulationParameters;
use crate::simulation::states::{NVec3, PointSet};
use crate::simulation::topology::{build_from_mesh, TopologyError};

/// Ticks per animation frame of the melon viewer
pub const DEFAULT_STEPS_PER_FRAME: usize = 3;

pub struct Simulator {
    params: SimulationParameters,
    points: PointSet,
    forces: ForceSet,
    ticks: u64, // ticks actually integrated (paused calls don't count)
}

impl Simulator {
    /// Barnes–Hut repulsion followed by springs, relocation rng seeded with `seed`
    pub fn new(points: PointSet, params: SimulationParameters, seed: u64) -> Self {
        let forces = ForceSet::new()
            .with(BarnesHutRepulsion::seeded(seed))
            .with(SpringLinks);
        Self::with_forces(points, params, forces)
    }

    pub fn with_forces(points: PointSet, params: SimulationParameters, forces: ForceSet) -> Self {
        Self {
            params,
            points,
            forces,
            ticks: 0,
        }
    }

    pub fn from_mesh(mesh: &SphereMesh, params: SimulationParameters, seed: u64) -> Result<Self, TopologyError> {
        let points = build_from_mesh(&mesh.vertices, &mesh.faces, mesh.width_segments, mesh.height_segments)?;
        Ok(Self::new(points, params, seed))
    }

    /// One tick. Does nothing while the simulation is paused.
    pub fn step(&mut self) {
        if !self.params.run_simulation {
            return;
        }
        euler_step(&mut self.points, &mut self.forces, &self.params);
        self.ticks += 1;
    }

    /// `steps` ticks, as done once per animation frame
    pub fn frame(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
        debug!("frame done, {} ticks total", self.ticks);
    }

    /// Positions of every point, slaves included, in id order
    pub fn read_positions(&self) -> Vec<NVec3> {
        self.points.positions()
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Parameter changes take effect from the next tick
    pub fn params_mut(&mut self) -> &mut SimulationParameters {
        &mut self.params
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
