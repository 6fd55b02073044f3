#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the settlement agent on a demo world.

mod demo;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use settler_ai_core::{BuildingType, Engine, Event, MapPoint};
use settler_ai_system_agent::{Agent, AgentConfig};
use settler_ai_world::{query, step};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs the agent headless and prints what it built.
#[derive(Parser, Debug)]
#[command(name = "settler-ai")]
#[command(about = "Runs the settlement agent on a generated demo world")]
struct Args {
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 3000)]
    ticks: u64,

    /// Width and height of the demo map.
    #[arg(long, default_value_t = 48)]
    size: u16,

    /// Seed for the scenery and, unless the config says otherwise, the agent.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Agent configuration in TOML.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    print_config: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Entry point for the settlement agent command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))
        .with_context(|| format!("invalid log level {:?}", args.log_level))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => AgentConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let mut config = AgentConfig::default();
            config.player.rng_seed = args.seed;
            config
        }
    };
    if args.print_config {
        print!("{}", config.to_toml().context("failed to render config")?);
        return Ok(());
    }

    let mut world = demo::demo_world(args.size, args.seed);
    let minimal_tick = config.player.minimal_tick;
    let mut agent = Agent::new(world.extent(), config);
    info!(size = args.size, seed = args.seed, ticks = args.ticks, "demo world ready");

    let mut requested = false;
    let mut events: Vec<Event> = Vec::new();
    for tick in 0..args.ticks {
        agent.on_tick(&mut world, tick, true, &events);
        if !requested && agent.acts() > 0 {
            request_economy(&mut agent, &world);
            requested = true;
        }
        events.clear();
        step(&mut world, &mut events);
    }

    println!("Settler AI");
    println!("==========");
    println!("Ticks: {} (acting from {})", args.ticks, minimal_tick);
    println!("Acts: {}", agent.acts());
    println!("Commands issued: {}", query::submitted_commands(&world).len());
    println!("Flags: {}", query::flags(&world).len());
    println!("Road links: {}", query::road_links(&world));
    println!("Buildings:");
    for (point, building, finished) in query::buildings(&world) {
        let state = if finished { "built" } else { "site" };
        println!("  {building:?} at ({}, {}) [{state}]", point.x(), point.y());
    }
    let pending = agent.actions().describe();
    if !pending.is_empty() {
        println!("Pending actions:");
        println!("{pending}");
    }
    Ok(())
}

// A small starter economy, standing in for the policy layer that decides
// what to build.
fn request_economy(agent: &mut Agent, world: &dyn Engine) {
    for building in [
        BuildingType::Woodcutter,
        BuildingType::Quarry,
        BuildingType::Forester,
        BuildingType::Fishery,
        BuildingType::Guardhouse,
    ] {
        let id = agent.request_building(world, building);
        info!(?building, %id, "building requested");
    }
    if let Some(mountain) = agent.view().mountains().first().copied() {
        let id = agent.request_geologists(mountain, 2);
        info!(point = ?mountain, %id, "geologists requested");
    } else if let Some(hq) = world.headquarters() {
        let survey = MapPoint::new(hq.x() + 4, hq.y());
        let _ = agent.request_geologists(survey, 1);
    }
}
