// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! RepTally - Repetition and Hold-Time Counting Engine
//!
//! Command line front end: replays recorded confidence traces or runs a
//! simulated multi-client workout against one shared engine.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use reptally::{
    read_trace, replay, ClientId, Config, ConfidenceSimulator, CountingEngine, EventBus,
    EventExporter, SessionHistory, VERSION,
};

/// RepTally - repetition and hold-time counting engine
#[derive(Parser, Debug)]
#[command(name = "reptally")]
#[command(author = "RepTally Project")]
#[command(version = VERSION)]
#[command(about = "Counts exercise repetitions and hold times from pose confidence signals")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Replay a recorded trace (.jsonl, .json or .csv)
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Run simulated clients
    #[arg(long)]
    demo: bool,

    /// Number of simulated clients
    #[arg(long)]
    clients: Option<usize>,

    /// Length of each simulated session in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Print the exercise profile table and exit
    #[arg(long)]
    list_profiles: bool,

    /// Export count events to this directory
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Do not persist finished sessions
    #[arg(long)]
    no_history: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("RepTally v{}", VERSION);

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Override with command line args
    if let Some(clients) = args.clients {
        config.simulation.clients = clients;
    }
    if let Some(duration) = args.duration {
        config.simulation.duration_secs = duration;
    }
    if let Some(export_dir) = args.export_dir.clone() {
        config.export.enabled = true;
        config.export.path = export_dir;
    }
    if args.no_history {
        config.database.enabled = false;
    }

    if args.list_profiles {
        list_profiles(&config)?;
        return Ok(());
    }

    if args.replay.is_none() && !args.demo {
        info!("Nothing to do: pass --replay <file> or --demo (see --help)");
        return Ok(());
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(config, args.replay))
}

fn list_profiles(config: &Config) -> Result<()> {
    let table = config.profile_table()?;
    for exercise in table.exercises() {
        let profile = table.lookup(exercise);
        println!(
            "{:<22} {:<18} high {:.2}  low {:.2}  cooldown {:.1}s  window {}{}",
            exercise,
            profile.mode.name(),
            profile.high_threshold,
            profile.low_threshold,
            profile.cooldown_seconds,
            profile.smoothing_window,
            if profile.use_raw_signal { " (raw)" } else { "" },
        );
    }
    Ok(())
}

async fn run(config: Config, replay_path: Option<PathBuf>) -> Result<()> {
    let event_bus = Arc::new(EventBus::new(config.engine.event_capacity));
    let engine = Arc::new(CountingEngine::from_config(&config)?.with_event_bus(event_bus.clone()));

    let history = if config.database.enabled {
        Some(Arc::new(SessionHistory::open(&config.database)?))
    } else {
        None
    };

    // Drain the event bus into the exporter
    let export_task = if config.export.enabled {
        let exporter = EventExporter::new(&config.export.path, config.export.format)?;
        let mut rx = event_bus.subscribe();
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(e) = exporter.export(&event) {
                            warn!("Event export failed: {}", e);
                        }
                    }
                    Err(RecvError::Lagged(missed)) => warn!("Exporter lagged, {} events lost", missed),
                    Err(RecvError::Closed) => break,
                }
            }
            if let Err(e) = exporter.close() {
                warn!("Closing export file failed: {}", e);
            }
            info!("Exported {} events", exporter.exported_count());
        }))
    } else {
        None
    };

    match replay_path {
        Some(path) => run_replay(&engine, history.as_deref(), &path)?,
        None => run_demo(&engine, history.clone(), &config).await?,
    }

    let stats = engine.stats();
    info!(
        "Done: {} active clients, {} repetitions, {:.1}s best holds",
        stats.active_clients, stats.total_repetitions, stats.total_best_hold
    );

    if let Some(history) = &history {
        info!("{} sessions in history", history.session_count()?);
    }

    // Closing the bus ends the exporter
    drop(engine);
    drop(event_bus);
    if let Some(task) = export_task {
        task.await?;
    }

    Ok(())
}

fn run_replay(engine: &CountingEngine, history: Option<&SessionHistory>, path: &std::path::Path) -> Result<()> {
    let frames = read_trace(path)?;
    let report = replay(engine, &frames);

    info!(
        "Replayed {} frames: {} repetitions, {} holds",
        report.frames_processed, report.repetitions_counted, report.holds_completed
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    for id in report.clients.keys() {
        if let Some(summary) = engine.remove_client(id) {
            if let Some(history) = history {
                history.record_session(&summary)?;
            }
        }
    }
    Ok(())
}

async fn run_demo(engine: &Arc<CountingEngine>, history: Option<Arc<SessionHistory>>, config: &Config) -> Result<()> {
    let sim = &config.simulation;
    let exercises: Vec<String> = engine.profiles().exercises().into_iter().map(str::to_string).collect();
    if exercises.is_empty() {
        anyhow::bail!("No exercise profiles configured");
    }
    info!(
        "Demo: {} clients, {:.0}s at {:.0} fps",
        sim.clients, sim.duration_secs, sim.fps
    );

    let mut handles = Vec::with_capacity(sim.clients);
    for i in 0..sim.clients {
        let engine = engine.clone();
        let history = history.clone();
        let exercise = exercises[i % exercises.len()].clone();
        let seed = sim.seed.map(|s| s.wrapping_add(i as u64));
        let (fps, duration) = (sim.fps, sim.duration_secs);

        handles.push(tokio::spawn(async move {
            let id = ClientId::from(format!("demo-{}", i + 1));
            engine.register_client(id.clone());
            engine.select_exercise(&id, &exercise);

            let mut simulator = ConfidenceSimulator::new(engine.profiles().lookup(&exercise), fps, seed)
                .with_hold_threshold(engine.constants().hold_threshold);
            let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / simulator.fps()));
            let frames = (duration.max(0.0) * simulator.fps()).round() as usize;

            for _ in 0..frames {
                interval.tick().await;
                let frame = simulator.next_frame(&id, &exercise);
                engine.update(&id, &exercise, frame.input());
            }

            if let Some(summary) = engine.remove_client(&id) {
                for result in &summary.exercises {
                    info!("{} {}: {} reps, best hold {:.1}s", id, result.exercise, result.repetitions, result.best_hold);
                }
                if let Some(history) = history {
                    history.record_session(&summary)?;
                }
            }
            Ok::<_, anyhow::Error>(())
        }));
    }

    // Periodic progress while clients run
    let progress = {
        let engine = engine.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(5));
            interval.tick().await;
            loop {
                interval.tick().await;
                let stats = engine.stats();
                info!(
                    "{} clients active, {} repetitions, in use: {}",
                    stats.active_clients,
                    stats.total_repetitions,
                    stats.exercises_in_use.join(", ")
                );
            }
        })
    };

    for handle in handles {
        handle.await??;
    }
    progress.abort();
    let _ = progress.await;

    Ok(())
}
