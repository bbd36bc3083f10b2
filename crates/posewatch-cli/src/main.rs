//! `posewatch` – command line front end of the state monitor.
//!
//! ```text
//! posewatch init                         write ~/.posewatch/config.toml
//! posewatch check-model [model.toml]     validate a model description
//! posewatch replay <session.jsonl> [--loops N] [--model PATH] [--topic TOPIC]
//! ```
//!
//! `replay` plays a recorded rosbridge session through an in-process bus and
//! transform buffer into a [`CurrentStateMonitor`], then prints the resulting
//! state, its age and any joints that never reported.  Ctrl-C stops the
//! playback early and still prints the report.

mod config;
mod replay;

use colored::Colorize;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::warn;

use posewatch_middleware::JointStateBus;
use posewatch_model::RobotModel;
use posewatch_monitor::CurrentStateMonitor;
use posewatch_tf::TransformBuffer;

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the filter (default "info"); POSEWATCH_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("POSEWATCH_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("init") => cmd_init(),
        Some("check-model") => cmd_check_model(args.get(1).map(String::as_str)),
        Some("replay") => cmd_replay(&args[1..]),
        Some("help") | Some("--help") | Some("-h") | None => {
            print_usage();
            Ok(())
        }
        Some(other) => Err(format!("unknown command '{other}'")),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_init() -> Result<(), String> {
    let path = config::config_path();
    if path.exists() {
        println!("  Config already exists at {}", path.display().to_string().bold());
        return Ok(());
    }
    config::save(&config::Config::default())?;
    println!(
        "  {} Config saved to {}",
        "✓".green().bold(),
        path.display().to_string().bold()
    );
    Ok(())
}

fn cmd_check_model(path: Option<&str>) -> Result<(), String> {
    let cfg = load_config();
    let path = path.unwrap_or(cfg.model_path.as_str());
    let model = RobotModel::load(Path::new(path)).map_err(|e| e.to_string())?;

    println!(
        "  {} {} ({} joints, {} variables, model frame '{}')",
        "✓".green().bold(),
        model.name().bold(),
        model.joints().len(),
        model.variable_count(),
        model.model_frame()
    );
    for joint in model.joints() {
        let source = if joint.is_multi_dof() {
            "transform".cyan()
        } else if joint.variable_count() == 0 {
            "fixed".dimmed()
        } else {
            "joint states".normal()
        };
        println!("    • {:<24} {:?} [{}]", joint.name(), joint.joint_type(), source);
    }
    for group in model.group_names() {
        if let Some(g) = model.group(group) {
            println!("    group {}: {}", group.bold(), g.active_joint_names().join(", "));
        }
    }
    Ok(())
}

fn cmd_replay(args: &[String]) -> Result<(), String> {
    let mut cfg = load_config();
    let mut recording_path = None;
    let mut it = args.iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--loops" => {
                cfg.replay.loops = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("--loops expects a positive integer")?;
            }
            "--model" => {
                cfg.model_path = it.next().ok_or("--model expects a path")?.clone();
            }
            "--topic" => {
                cfg.joint_states_topic = it.next().ok_or("--topic expects a topic name")?.clone();
            }
            other if recording_path.is_none() => recording_path = Some(other.to_string()),
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    let recording_path = recording_path.ok_or("replay expects a recording file")?;

    let model = Arc::new(
        RobotModel::load(Path::new(&cfg.model_path)).map_err(|e| e.to_string())?,
    );
    let recording = replay::load_recording(Path::new(&recording_path))?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping playback …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to start async runtime: {e}"))?;
    let bus = Arc::new(JointStateBus::with_default_capacity(runtime.handle().clone()));
    let tf = Arc::new(TransformBuffer::new());

    let mut monitor =
        CurrentStateMonitor::new(Arc::clone(&model), Some(Arc::clone(&tf)), cfg.monitor.clone())
            .with_joint_state_source(bus.clone());
    monitor.start(&cfg.joint_states_topic);

    println!(
        "  Replaying {} frame(s) from {} ({} loop(s)) on {}",
        recording.frames.len(),
        recording_path.bold(),
        cfg.replay.loops,
        monitor.monitored_topic().cyan()
    );
    if recording.malformed > 0 {
        println!("  {} {} malformed line(s) skipped", "!".yellow().bold(), recording.malformed);
    }

    let summary = replay::replay(
        &recording,
        &bus,
        &tf,
        cfg.replay.loops,
        Duration::from_millis(cfg.replay.frame_interval_ms),
        &shutdown,
    );
    let settled =
        monitor.wait_for_complete_state(None, Duration::from_millis(cfg.replay.settle_timeout_ms));

    print_report(&monitor, &summary, settled.err());
    monitor.stop();
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_report(
    monitor: &CurrentStateMonitor,
    summary: &replay::ReplaySummary,
    incomplete: Option<posewatch_monitor::MonitorError>,
) {
    println!();
    println!(
        "  {} joint batch(es), {} transform batch(es), {} ignored, {} loop(s){}",
        summary.joint_batches,
        summary.transform_batches,
        summary.ignored,
        summary.loops_completed,
        if summary.interrupted { " – interrupted".yellow().to_string() } else { String::new() }
    );

    let (state, time) = monitor.current_state_and_time(None);
    println!();
    for (name, value) in monitor.model().variable_names().iter().zip(state.variable_positions()) {
        println!("    {:<28} {:>12.6}", name, value);
    }
    println!();

    if time.is_zero() {
        println!("  State time: {}", "never fully updated".yellow());
    } else {
        println!("  State time: {}", time.to_string().bold());
    }
    match incomplete {
        None => println!("  {} State complete", "✓".green().bold()),
        Some(e) => println!("  {} {}", "✗".red().bold(), e),
    }
}

fn print_usage() {
    println!();
    println!(
        "  {} {}",
        "posewatch".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Live robot state from joint-state and transform feeds");
    println!();
    println!("  {}", "Commands:".bold());
    println!("    init                              write the default config file");
    println!("    check-model [model.toml]          load and summarise a robot model");
    println!("    replay <session.jsonl> [options]  play a recorded rosbridge session");
    println!();
    println!("  {}", "Replay options:".bold());
    println!("    --loops N        play the recording N times");
    println!("    --model PATH     robot model description");
    println!("    --topic TOPIC    joint-states topic to monitor");
    println!();
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// The saved config, or defaults (with environment overrides) when there is
/// none or it cannot be read.
fn load_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => cfg,
        Ok(None) => {
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}
