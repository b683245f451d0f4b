//! Continuum robot simulator
//!
//! Opens an interactive viewer by default. `--headless` replays scripted key
//! presses for a fixed number of ticks and logs every rendered frame.

mod config;
mod headless;
mod viewer;

use std::path::PathBuf;

use clap::Parser;
use log::{error, info};
use mechanics::{ConcentricTubeModel, TendonDrivenModel};
use simcore::{KinematicModel, ScenarioMode};
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode};

use crate::config::{AppConfig, ConfigError, RobotKind};

/// Forward kinematics simulator for continuum robots
#[derive(Parser, Debug)]
#[command(name = "continuum-sim")]
#[command(about = "Forward kinematics simulator for continuum robots", long_about = None)]
#[command(version)]
struct Cli {
    /// Scenario: a0 (default bindings) or a4 (assignment 4 preset), overrides the config file
    scenario: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Robot to simulate, overrides the config file
    #[arg(long, value_enum)]
    robot: Option<RobotKind>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Timer ticks delivered in headless mode
    #[arg(long, default_value_t = 10)]
    ticks: u32,

    /// Key presses replayed before the first tick in headless mode
    #[arg(long, value_delimiter = ',')]
    keys: Vec<String>,

    /// Write the end-effector trace of a headless run as CSV
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level,
        simplelog::Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let mut config = AppConfig::load(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config)?;

    let model: Box<dyn KinematicModel> = match config.robot {
        RobotKind::Tdcr => Box::new(TendonDrivenModel::new(config.tdcr.clone())?),
        RobotKind::Ctcr => Box::new(ConcentricTubeModel::new(config.ctcr.clone())?),
    };
    info!("{} with {} inputs", model.name(), model.dof());

    if cli.headless {
        let (renderer, stats) = headless::run(model.as_ref(), config.simulation, &cli.keys, cli.ticks)?;
        let scenario = renderer.scenario().unwrap_or(config.simulation.scenario);
        let disks = renderer.skeleton().map_or(0, |s| s.disk_count);
        info!(
            "headless run in scenario {} finished: {} ticks, {} renders, {} failures, {} ignored keys ({} poses per segment)",
            scenario, stats.ticks, stats.renders, stats.failures, stats.ignored_keys, disks
        );
        if let Some(path) = &cli.trace {
            if let Err(err) = headless::write_trace(&renderer, path) {
                error!("cannot write trace {}: {}", path.display(), err);
                return Err(err.into());
            }
        }
        return Ok(());
    }

    viewer::run(model.as_ref(), config.simulation, &config.viewer)
}

/// Command-line values win over the config file, which wins over defaults.
fn apply_overrides(cli: &Cli, config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(scenario) = &cli.scenario {
        config.simulation.scenario = scenario.parse::<ScenarioMode>()?;
    }
    if let Some(robot) = cli.robot {
        config.robot = robot;
    }
    Ok(())
}
