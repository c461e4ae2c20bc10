//! `inspectline` – runs the inspection line from the terminal.
//!
//! 1. Loads `~/.inspectline/config.toml`, writing the defaults on first run.
//! 2. Installs the tracing pipeline and a **Ctrl-C** handler that stops the
//!    run after the current tick.
//! 3. In keyboard mode, starts the operator prompt on its own thread; in
//!    scripted mode, feeds the configured verdicts.
//! 4. Ticks the line (optionally at wall-clock pace) until every item is
//!    processed, the tick limit is hit, or the operator quits, then prints a
//!    summary.

mod config;
mod repl;

use colored::Colorize;
use std::collections::BTreeMap;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::{error, warn};

use config::{Config, DecisionMode};
use inspectline_middleware::{EventBus, Topic, TopicReceiver};
use inspectline_runtime::{
    DecisionSource, JsonLinesTraceLog, LineLoop, LineSnapshot, ScriptedDecisions, TracingRenderer,
    decision_channel, init_tracing,
};
use inspectline_types::{Decision, EventPayload, ItemState};

/// Why the run stopped.
enum RunEnd {
    Finished,
    TickLimit,
    Stopped,
    Fault,
}

fn main() -> ExitCode {
    let _telemetry = init_tracing("inspectline");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let mut cfg = Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    };

    // ── Shutdown flag ─────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the line …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Line ──────────────────────────────────────────────────────────────
    let bus = EventBus::default();
    let mut inspection_events = bus.subscribe_to(Topic::Inspection);
    let mut audit_events = bus.subscribe_to(Topic::Audit);

    let mut line = match LineLoop::new(cfg.line.clone()) {
        Ok(line) => line
            .with_bus(bus)
            .with_renderer(Box::new(TracingRenderer)),
        Err(e) => {
            println!("{}: {}", "Invalid line configuration".red(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &cfg.trace_log_path {
        match JsonLinesTraceLog::open(path) {
            Ok(log) => {
                println!("  Trace log: {}", path.display().to_string().bold());
                line = line.with_trace_sink(Box::new(log));
            }
            Err(e) => println!("{}: {}", "Trace log unavailable".red(), e),
        }
    }

    // ── Verdicts ──────────────────────────────────────────────────────────
    let (status_tx, status_rx) = mpsc::channel();
    let source: Box<dyn DecisionSource> = match cfg.decision_mode {
        DecisionMode::Keyboard => {
            let (tx, rx) = decision_channel();
            if let Err(e) = repl::spawn(tx, status_tx, shutdown.clone()) {
                println!("{}: {}", "Could not start the prompt".red(), e);
                return ExitCode::FAILURE;
            }
            repl::print_help();
            Box::new(rx)
        }
        DecisionMode::Scripted => {
            drop(status_tx);
            Box::new(
                ScriptedDecisions::new(cfg.scripted_verdicts.iter().copied())
                    .with_fallback(cfg.scripted_fallback),
            )
        }
    };
    line = line.with_decision_source(source);

    println!(
        "  {} items, {} mode, {}\n",
        line.registry().len().to_string().bold(),
        cfg.decision_mode.to_string().bold(),
        if cfg.realtime { "real-time" } else { "fast-forward" }
    );

    // ── Tick loop ─────────────────────────────────────────────────────────
    let tick = Duration::from_secs_f64(cfg.line.tick_secs);
    let end = loop {
        if shutdown.load(Ordering::SeqCst) {
            break RunEnd::Stopped;
        }
        if line.is_finished() {
            break RunEnd::Finished;
        }
        if line.tick_count() >= cfg.max_ticks {
            break RunEnd::TickLimit;
        }

        let started = Instant::now();
        if let Err(e) = line.tick() {
            error!(error = %e, tick = line.tick_count(), "line fault");
            println!("{}: {}", "Line fault".red().bold(), e);
            break RunEnd::Fault;
        }

        report_events(&mut inspection_events, &mut audit_events, cfg.decision_mode);
        while status_rx.try_recv().is_ok() {
            print_status(&line.snapshot());
        }

        if cfg.realtime
            && let Some(rest) = tick.checked_sub(started.elapsed())
        {
            std::thread::sleep(rest);
        }
    };

    let snapshot = line.snapshot();
    print_summary(&snapshot, &end);
    shutdown.store(true, Ordering::SeqCst);

    match end {
        RunEnd::Fault => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn report_events(inspection: &mut TopicReceiver, audit: &mut TopicReceiver, mode: DecisionMode) {
    for event in inspection.drain() {
        if let EventPayload::ItemArrived { item, batch_tag } = event.payload {
            print!("  {} {} [{}] at inspection", "▶".cyan(), item.to_string().bold(), batch_tag);
            if mode == DecisionMode::Keyboard {
                print!(" – {} accept, {} reject", "1/a".bold(), "0/r".bold());
            }
            println!();
        }
    }
    for event in audit.drain() {
        match event.payload {
            EventPayload::ItemProcessed { item, outcome } => {
                let label = match outcome {
                    Decision::Accept => "ACCEPTED".green(),
                    Decision::Reject => "REJECTED".red(),
                };
                println!("  {} {} {}", "✓".green(), item.to_string().bold(), label);
            }
            EventPayload::Fault { component, message } => {
                println!("  {} {}: {}", "⚠".yellow(), component.yellow(), message);
            }
            _ => {}
        }
    }
}

fn print_status(snap: &LineSnapshot) {
    println!();
    println!("{}", "Line Status".bold().underline());
    println!("  Tick            : {}", snap.tick);
    println!(
        "  Conveyor        : {}",
        if snap.ran_last_tick { "running".green() } else { "stopped".yellow() }
    );
    match snap.pending_item {
        Some(item) if snap.decision_pending => {
            println!("  Inspection      : {} awaiting verdict", item.to_string().bold())
        }
        Some(item) => println!("  Inspection      : {} being rejected", item.to_string().bold()),
        None => println!("  Inspection      : empty"),
    }
    println!("  Pusher          : {}", snap.pusher_phase);
    for item in &snap.items {
        println!(
            "    {:<8} {:<4} {:<18} x={:+.3} y={:+.3}",
            item.handle.to_string(),
            item.batch_tag,
            item.state.to_string(),
            item.position.x,
            item.position.y
        );
    }
    println!();
}

fn print_summary(snap: &LineSnapshot, end: &RunEnd) {
    let reason = match end {
        RunEnd::Finished => "all items processed".green(),
        RunEnd::TickLimit => "tick limit reached".yellow(),
        RunEnd::Stopped => "stopped by operator".yellow(),
        RunEnd::Fault => "line fault".red(),
    };
    println!();
    println!("{}", "═══════════════════════════════════════".bold());
    println!("  Run ended after {} ticks: {}", snap.tick, reason);

    // batch tag -> (accepted, rejected, unfinished)
    let mut per_batch: BTreeMap<&str, (usize, usize, usize)> = BTreeMap::new();
    for item in &snap.items {
        let entry = per_batch.entry(item.batch_tag.as_str()).or_default();
        match (item.state, item.outcome) {
            (ItemState::Processed, Some(Decision::Accept)) => entry.0 += 1,
            (ItemState::Processed, Some(Decision::Reject)) => entry.1 += 1,
            _ => entry.2 += 1,
        }
    }
    for (tag, (accepted, rejected, unfinished)) in per_batch {
        println!(
            "    {:<4} {} accepted  {} rejected  {} unfinished",
            tag.bold(),
            accepted.to_string().green(),
            rejected.to_string().red(),
            unfinished
        );
    }
    println!("{}", "═══════════════════════════════════════".bold());
}

fn print_banner() {
    println!();
    println!("{}", "  ┌─┐  InspectLine".bold().cyan());
    println!("{}", "  └─┘→ conveyor inspection & reject station".cyan());
    println!(
        "  {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!();
}
