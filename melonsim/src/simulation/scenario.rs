//! Build runnable melon scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces a `Scenario`
//! containing:
//! - the simulator (point set, force terms, parameters)
//! - the headless run settings (frames, ticks per frame)

use log::{debug, info};

use crate::configuration::config::{ConfigError, ScenarioConfig};
use crate::mesh::sphere::SphereMesh;
use crate::simulation::engine::Simulator;
use crate::simulation::params::SimulationParameters;
use crate::simulation::topology::TopologyError;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("invalid scenario: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid mesh topology: {0}")]
    Topology(#[from] TopologyError),
}

/// What a headless run ended with
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub points: usize,
    pub max_coordinate: f64, // largest |x|, |y| or |z| over all points
    pub mean_radius: f64, // mean distance of all points from the origin
}

pub struct Scenario {
    pub simulator: Simulator,
    pub frames: usize,
    pub steps_per_frame: usize,
}

impl Scenario {
    pub fn build_scenario(cfg: ScenarioConfig) -> Result<Self, ScenarioError> {
        cfg.validate()?;

        let mesh = SphereMesh::new(cfg.mesh.radius, cfg.mesh.width_segments, cfg.mesh.height_segments);
        let params = SimulationParameters::from(cfg.simulation);
        let simulator = Simulator::from_mesh(&mesh, params, cfg.run.seed)?;

        info!(
            "scenario: {} points ({} masters), {} links, {} frames x {} ticks",
            simulator.points().len(),
            simulator.points().masters().len(),
            simulator.points().links.len(),
            cfg.run.frames,
            cfg.run.steps_per_frame
        );

        Ok(Self {
            simulator,
            frames: cfg.run.frames,
            steps_per_frame: cfg.run.steps_per_frame,
        })
    }

    /// Run every configured frame
    pub fn run(&mut self) -> RunSummary {
        for frame in 0..self.frames {
            self.simulator.frame(self.steps_per_frame);
            debug!("frame {}/{}", frame + 1, self.frames);
        }
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        let positions = self.simulator.read_positions();
        let max_coordinate = positions.iter().map(|x| x.amax()).fold(0.0, f64::max);
        let mean_radius = if positions.is_empty() {
            0.0
        } else {
            positions.iter().map(|x| x.norm()).sum::<f64>() / positions.len() as f64
        };

        RunSummary {
            ticks: self.simulator.ticks(),
            points: positions.len(),
            max_coordinate,
            mean_radius,
        }
    }
}
