//! Prism collision demo
//!
//! Generates a seeded population of prisms and runs the collision pipeline
//! on a fixed interval, logging a summary of every tick.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, Command};
use prism_engine::foundation::logging;
use prism_engine::prelude::*;

fn main() -> Result<()> {
    logging::init_with_level(log::LevelFilter::Info);

    let matches = Command::new("prism_sim")
        .about("Pushes overlapping convex prisms apart on a fixed tick")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML or RON simulation config")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("ticks")
                .short('n')
                .long("ticks")
                .value_name("COUNT")
                .help("Stop after this many ticks")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("duration")
                .short('d')
                .long("duration")
                .value_name("SECONDS")
                .help("Cancel the loop after this many seconds")
                .value_parser(value_parser!(f32)),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .help("Override the setup seed")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("bodies")
                .short('b')
                .long("bodies")
                .value_name("COUNT")
                .help("Override the number of generated prisms")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("backend")
                .long("backend")
                .value_name("octree|quadtree")
                .help("Spatial index backend"),
        )
        .arg(
            Arg::new("planar")
                .long("planar")
                .help("Ignore height in narrow-phase tests")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dedupe")
                .long("dedupe")
                .help("Test each pair at most once per tick")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => SimulationConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SimulationConfig::default(),
    };

    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.seed = seed;
    }
    if let Some(&bodies) = matches.get_one::<usize>("bodies") {
        config.body_count = bodies;
    }
    if let Some(backend) = matches.get_one::<String>("backend") {
        config.index_backend = backend.parse().context("Invalid --backend")?;
    }
    if matches.get_flag("planar") {
        config.planar_only = true;
    }
    if matches.get_flag("dedupe") {
        config.dedupe_pairs = true;
    }

    let mut world = PrismWorld::new(config).context("Failed to set up the world")?;
    let mut tick_loop = TickLoop::from_config(world.config());
    let cancel = CancellationToken::new();

    if let Some(&secs) = matches.get_one::<f32>("duration") {
        let timer = cancel.clone();
        let limit = Duration::try_from_secs_f32(secs).context("Invalid --duration")?;
        thread::spawn(move || {
            thread::sleep(limit);
            timer.cancel();
        });
    }

    let max_ticks = matches.get_one::<u64>("ticks").copied();
    let stopwatch = Stopwatch::start_new();
    let completed = tick_loop.run_with(&mut world, &cancel, max_ticks, |report| {
        log::info!(
            "Tick {:>4}: {:>4} candidates, {:>3} hits, {} failures ({:.2} ms)",
            report.tick,
            report.candidates,
            report.hits,
            report.narrow_phase_failures,
            report.elapsed.as_secs_f64() * 1000.0
        );
    });

    let still_colliding: Vec<_> = world.bodies().filter(|body| body.colliding).map(|body| body.index).collect();
    log::info!(
        "Finished {} ticks in {:.1} ms; {} of {} bodies flagged in the last tick {:?}",
        completed,
        stopwatch.elapsed_millis(),
        still_colliding.len(),
        world.body_count(),
        still_colliding
    );

    Ok(())
}
