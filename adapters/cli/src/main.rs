#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless Lane Defence session.

mod layout;
mod session;

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use lane_defence_core::{ObstacleMap, SimulationConfig};
use lane_defence_world::World;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use crate::{
    layout::{parse_layout, render_layout, scatter_obstacles},
    session::{Session, Summary},
};

/// Stream offset separating the adapter's placement draws from the world's.
const ADAPTER_STREAM: u64 = 0x0c11_ad4a_7e55_0001;

#[derive(Debug, Parser)]
#[command(version, about = "Run a headless Lane Defence session")]
struct Cli {
    /// TOML file holding the simulation configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// ASCII obstacle layout, one line per row (`#` blocked, `.` free).
    #[arg(long, conflicts_with = "obstacles")]
    layout: Option<PathBuf>,
    /// Number of obstacles scattered at random when no layout is given.
    #[arg(long, default_value_t = 0)]
    obstacles: usize,
    /// Maximum number of ticks to simulate.
    #[arg(long, default_value_t = 6_000)]
    ticks: u64,
    /// Length of every tick in milliseconds.
    #[arg(long, default_value_t = 50)]
    dt_ms: u64,
    /// Overrides the seed from the configuration.
    #[arg(long)]
    seed: Option<u64>,
    /// Number of stationary weapons placed on the right half of the board.
    #[arg(long, default_value_t = 4)]
    weapons: usize,
    /// Prints the summary as JSON.
    #[arg(long)]
    json: bool,
}

/// Entry point for the Lane Defence command-line interface.
fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    let bounds = config.grid.bounds();
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed ^ ADAPTER_STREAM);

    let obstacles = match &cli.layout {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read layout {}", path.display()))?;
            parse_layout(bounds, &text)
                .with_context(|| format!("invalid layout {}", path.display()))?
        }
        None => scatter_obstacles(bounds, cli.obstacles, &mut rng),
    };

    let world = World::new(config).context("invalid simulation configuration")?;
    let mut session = Session::new(world, obstacles, cli.weapons, &mut rng);
    let summary = session
        .run(cli.ticks, Duration::from_millis(cli.dt_ms))
        .clone();

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to encode summary")?
        );
    } else {
        print!("{}", describe(&summary, session.obstacles()));
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

fn describe(summary: &Summary, obstacles: &ObstacleMap) -> String {
    let outcome = if summary.game_over {
        "base line breached"
    } else if summary.victory {
        "all waves cleared"
    } else {
        "still running"
    };
    format!(
        "{layout}\n\
         outcome:        {outcome}\n\
         ticks:          {ticks}\n\
         waves reached:  {waves} ({cleared} cleared)\n\
         enemies:        {spawned} spawned, {destroyed} destroyed, {breached} breached\n\
         forced moves:   {forced}\n\
         rewards:        {rewards}\n\
         weapons:        {lost} of {placed} lost\n",
        layout = render_layout(obstacles),
        ticks = summary.ticks,
        waves = summary.waves_reached,
        cleared = summary.waves_cleared,
        spawned = summary.spawned,
        destroyed = summary.destroyed,
        breached = summary.breached,
        forced = summary.forced_moves,
        rewards = summary.rewards,
        lost = summary.weapons_lost,
        placed = summary.weapons_placed,
    )
}
