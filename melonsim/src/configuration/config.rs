//! Configuration types for loading melon scenarios from YAML.
//!
//! A scenario consists of:
//!
//! - [`ParametersConfig`] – initial simulation parameters
//! - [`MeshConfig`]       – the UV sphere the melon starts from
//! - [`RunConfig`]        – how long to run headless and the relocation seed
//! - [`ScenarioConfig`]   – top-level wrapper used to load a scenario from YAML
//!
//! Every field is optional; missing fields take the defaults of the melon
//! viewer.
//!
//! # YAML format
//!
//! ```yaml
//! simulation:
//!   run_simulation: true
//!   sphere_radius: 1200.0          # bounding domain
//!   minimum_body_separation: 25.0  # octree escape-valve threshold
//!   charge: 30.0                   # repulsion strength
//!   theta: 0.6                     # Barnes–Hut opening threshold
//!   spring_constant: 5.0           # link stiffness
//!
//! mesh:
//!   radius: 600.0
//!   width_segments: 16
//!   height_segments: 16
//!
//! run:
//!   frames: 600
//!   steps_per_frame: 3
//!   seed: 42
//! ```

use serde::Deserialize;
use thiserror::Error;

use crate::simulation::engine::DEFAULT_STEPS_PER_FRAME;
use crate::simulation::params::SimulationParameters;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("mesh needs at least 3 width and 2 height segments, got {width}x{height}")]
    MeshTooCoarse { width: usize, height: usize },

    #[error("mesh radius {mesh} does not fit inside sphere radius {sphere}")]
    MeshOutsideSphere { mesh: f64, sphere: f64 },
}

/// Initial simulation parameters
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ParametersConfig {
    pub run_simulation: bool, // start running or paused
    pub sphere_radius: f64, // bounding sphere radius, also the octree root half-extent
    pub minimum_body_separation: f64, // octree nodes smaller than this never subdivide
    pub charge: f64, // repulsion coefficient
    pub theta: f64, // Barnes–Hut accuracy, smaller is more exact
    pub spring_constant: f64, // link stiffness
}

impl Default for ParametersConfig {
    fn default() -> Self {
        let p = SimulationParameters::default();
        Self {
            run_simulation: p.run_simulation,
            sphere_radius: p.sphere_radius,
            minimum_body_separation: p.minimum_body_separation,
            charge: p.charge,
            theta: p.theta,
            spring_constant: p.spring_constant,
        }
    }
}

impl From<ParametersConfig> for SimulationParameters {
    fn from(cfg: ParametersConfig) -> Self {
        Self {
            run_simulation: cfg.run_simulation,
            sphere_radius: cfg.sphere_radius,
            minimum_body_separation: cfg.minimum_body_separation,
            charge: cfg.charge,
            theta: cfg.theta,
            spring_constant: cfg.spring_constant,
        }
    }
}

/// UV sphere the melon is built from
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct MeshConfig {
    pub radius: f64,
    pub width_segments: usize, // segments around the equator
    pub height_segments: usize, // segments pole to pole
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            radius: 600.0,
            width_segments: 16,
            height_segments: 16,
        }
    }
}

/// Headless run settings
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RunConfig {
    pub frames: usize, // animation frames to simulate
    pub steps_per_frame: usize, // ticks per frame
    pub seed: u64, // seed for octree relocation, makes runs reproducible
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            steps_per_frame: DEFAULT_STEPS_PER_FRAME,
            seed: 42,
        }
    }
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct ScenarioConfig {
    pub simulation: ParametersConfig,
    pub mesh: MeshConfig,
    pub run: RunConfig,
}

impl ScenarioConfig {
    /// Reject values the simulation cannot do anything sensible with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.simulation;
        let positive = [
            ("sphere_radius", s.sphere_radius),
            ("minimum_body_separation", s.minimum_body_separation),
            ("mesh.radius", self.mesh.radius),
        ];
        for (field, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }

        // theta = 0 opens every node, i.e. exact all-pairs repulsion
        if s.theta.is_nan() || s.theta < 0.0 {
            return Err(ConfigError::Negative {
                field: "theta",
                value: s.theta,
            });
        }

        if self.mesh.width_segments < 3 || self.mesh.height_segments < 2 {
            return Err(ConfigError::MeshTooCoarse {
                width: self.mesh.width_segments,
                height: self.mesh.height_segments,
            });
        }

        if self.mesh.radius >= s.sphere_radius {
            return Err(ConfigError::MeshOutsideSphere {
                mesh: self.mesh.radius,
                sphere: s.sphere_radius,
            });
        }

        Ok(())
    }
}
