pub mod simulation;
pub mod configuration;
pub mod mesh;
pub mod benchmark;

pub use simulation::states::{Point, Link, PointSet, NVec3};
pub use simulation::params::SimulationParameters;
pub use simulation::barnes_hut::{OctTree, OctNode};
pub use simulation::forces::{ForceSet, ForceTerm, BarnesHutRepulsion, DirectRepulsion, SpringLinks};
pub use simulation::integrator::euler_step;
pub use simulation::topology::{build_from_mesh, TopologyError};
pub use simulation::engine::Simulator;
pub use simulation::scenario::{Scenario, ScenarioError, RunSummary};

pub use configuration::config::{ScenarioConfig, ParametersConfig, MeshConfig, RunConfig, ConfigError};

pub use mesh::sphere::{SphereMesh, Face};

pub use benchmark::benchmark::{bench_repulsion, bench_tick_curve};
