use melonsim::{Scenario, ScenarioConfig};
use melonsim::{bench_repulsion, bench_tick_curve};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(about = "Headless Barnes-Hut melon simulation")]
struct Args {
    /// Scenario file under the crate's scenarios/ directory
    #[arg(short, default_value = "default.yaml")]
    file_name: String,

    /// Override the number of frames to simulate
    #[arg(long)]
    frames: Option<usize>,

    /// Write the final positions as YAML
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run the direct vs Barnes-Hut benchmarks instead of a scenario
    #[arg(long)]
    bench: bool,
}

// load here to keep main clean
fn load_scenario_from_yaml(file_name: &str) -> Result<ScenarioConfig> {
    let config_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(file_name);
    let file = File::open(&config_path)
        .with_context(|| format!("failed to open scenario {}", config_path.display()))?;
    let reader = BufReader::new(file);
    let scenario_cfg: ScenarioConfig = serde_yaml::from_reader(reader)
        .with_context(|| format!("failed to parse scenario {}", config_path.display()))?;

    Ok(scenario_cfg)
}

fn write_positions(path: &Path, scenario: &Scenario) -> Result<()> {
    let positions: Vec<[f64; 3]> = scenario
        .simulator
        .read_positions()
        .iter()
        .map(|x| [x.x, x.y, x.z])
        .collect();

    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_yaml::to_writer(BufWriter::new(file), &positions)?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.bench {
        bench_repulsion();
        bench_tick_curve();
        return Ok(());
    }

    let mut scenario_cfg = load_scenario_from_yaml(&args.file_name)?;
    if let Some(frames) = args.frames {
        scenario_cfg.run.frames = frames;
    }

    let mut scenario = Scenario::build_scenario(scenario_cfg)?;
    let summary = scenario.run();

    info!(
        "{} ticks over {} points, max |coordinate| = {:.3}, mean radius = {:.3}",
        summary.ticks, summary.points, summary.max_coordinate, summary.mean_radius
    );

    if let Some(path) = &args.output {
        write_positions(path, &scenario)?;
        info!("positions written to {}", path.display());
    }

    Ok(())
}
