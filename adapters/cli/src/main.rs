#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Headless command-line runner for Matrix Maze sessions.

mod autopilot;
mod summary;

use std::{cell::Cell, fs, path::PathBuf, rc::Rc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{debug, info};
use matrix_maze_core::{AudioCue, SessionOutcome, SimulationConfig};
use matrix_maze_session::{AudioSink, HudFrame, HudSink, Session, SessionObserver};
use matrix_maze_world::query;

use crate::{autopilot::Autopilot, summary::Summary};

/// Runs a Matrix Maze session without a window, driven by a scripted player.
#[derive(Debug, Parser)]
#[command(name = "matrix-maze", version)]
struct Args {
    /// TOML file overriding the default tuning.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Seed for every random stream. Overrides the config file.
    #[arg(long)]
    seed: Option<u64>,
    /// Maximum number of frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    ticks: u64,
    /// Simulated frames per second.
    #[arg(long, default_value_t = 60)]
    fps: u32,
    /// Number of agents to spawn. Overrides the config file.
    #[arg(long)]
    agents: Option<u32>,
    /// Raise the default log filter to `debug`.
    #[arg(short, long)]
    verbose: bool,
    /// Print the generated maze before running.
    #[arg(long)]
    print_maze: bool,
}

struct LoggedAudio;

impl AudioSink for LoggedAudio {
    fn play(&mut self, cue: AudioCue) {
        debug!("audio cue {cue:?}");
    }
}

#[derive(Default)]
struct LoggedHud {
    last_health: Option<f32>,
}

impl HudSink for LoggedHud {
    fn present(&mut self, frame: &HudFrame) {
        if self.last_health != Some(frame.health_fraction) {
            self.last_health = Some(frame.health_fraction);
            debug!(
                "health {:.0}%, ammo {}/{}, agents left {}",
                frame.health_fraction * 100.0,
                frame.rounds,
                frame.clip_size,
                frame.agents_remaining
            );
        }
    }

    fn map_reveal(&mut self, active: bool, remaining: Duration) {
        if active {
            info!("map revealed for {:.1}s", remaining.as_secs_f32());
        } else {
            info!("map hidden");
        }
    }
}

struct OutcomeSlot(Rc<Cell<Option<SessionOutcome>>>);

impl SessionObserver for OutcomeSlot {
    fn finished(&mut self, outcome: SessionOutcome) {
        self.0.set(Some(outcome));
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.fps == 0 {
        bail!("--fps must be at least 1");
    }
    let config = load_config(&args)?;
    let dt = Duration::from_secs_f64(1.0 / f64::from(args.fps));

    let outcome = Rc::new(Cell::new(None));
    let mut session = Session::new(config)
        .with_audio(LoggedAudio)
        .with_hud(LoggedHud::default())
        .with_observer(OutcomeSlot(Rc::clone(&outcome)));

    if args.print_maze {
        println!("{}", query::navigation(session.world()).to_ascii());
    }

    let mut autopilot = Autopilot::new(session.world());
    let mut summary = Summary::default();
    for _ in 0..args.ticks {
        let input = autopilot.input(session.world());
        summary.record(&session.step(&input, dt));
        if outcome.get().is_some() {
            break;
        }
    }

    println!("{}", summary.report(session.world(), outcome.get()));
    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            SimulationConfig::from_toml_str(&source)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(agents) = args.agents {
        config.agent.count = agents;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
