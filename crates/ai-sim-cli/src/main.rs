//! ai-sim - headless runner for perception and reaction scenarios.
//!
//! - `ai-sim run <scenario>` - step a scenario and print the actions rules start
//! - `ai-sim validate <scenario>` - build every asset and report skipped rules

mod scenario;
mod sim;

use std::path::{Path, PathBuf};

use ai_reaction::{ActionKind, ActionRequest};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::scenario::Scenario;
use crate::sim::Simulation;

#[derive(Parser)]
#[command(name = "ai-sim")]
#[command(about = "Sensor perception and reaction rules sandbox", version)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Step a scenario and print every action started by a reaction rule
    Run {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Number of frames to simulate
        #[arg(long, default_value_t = 100)]
        ticks: u64,

        /// Frame length in seconds, overriding the scenario's `Dt`
        #[arg(long)]
        dt: Option<f32>,

        /// World seed, overriding the scenario's `Seed`
        #[arg(long)]
        seed: Option<u64>,

        /// Print one JSON object per frame instead of text
        #[arg(long)]
        json: bool,
    },

    /// Build all sensors and rules of a scenario without running it
    Validate {
        /// Scenario JSON file
        scenario: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            dt,
            seed,
            json,
        } => run(&scenario, ticks, dt, seed, json),
        Commands::Validate { scenario } => validate(&scenario),
    }
}

fn run(path: &Path, ticks: u64, dt: Option<f32>, seed: Option<u64>, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let mut sim = Simulation::build(scenario, seed)?;
    if let Some(dt) = dt {
        sim.set_dt(dt)?;
    }

    let mut started = 0usize;
    for _ in 0..ticks {
        let frame = sim.step();
        started += frame.started.len();
        if json {
            println!("{}", serde_json::to_string(&frame).context("encoding frame")?);
            continue;
        }
        for (entity, request) in &frame.started {
            println!(
                "{:>6} {:>9.2}s  entity {:<5} {}",
                frame.tick,
                frame.time,
                entity,
                describe(request)
            );
        }
    }

    info!(ticks, actions = started, "run finished");
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let scenario = Scenario::load(path)?;
    let sim = Simulation::build(scenario, None)?;

    for report in sim.reports() {
        println!(
            "entity {:<5} sensors {:<3} rules {}/{}",
            report.entity, report.sensors, report.built_rules, report.declared_rules
        );
    }
    sim.ensure_complete()?;

    println!("{} is valid", path.display());
    Ok(())
}

fn describe(request: &ActionRequest<u64>) -> String {
    let kind = match &request.kind {
        ActionKind::Wait { seconds } => format!("wait {seconds:.2}s"),
        ActionKind::PlayAnimation {
            path,
            seconds: Some(seconds),
        } => format!("play `{path}` for {seconds:.2}s"),
        ActionKind::PlayAnimation { path, seconds: None } => format!("play `{path}` until cleared"),
        ActionKind::TurnTo {
            target,
            reverse: false,
        } => format!("turn to {target}"),
        ActionKind::TurnTo {
            target,
            reverse: true,
        } => format!("turn away from {target}"),
    };
    format!("[prio {:>3}] {kind}", request.priority)
}
