//! Operator prompt for keyboard mode.
//!
//! Runs on its own thread so the line keeps ticking while the operator
//! types.  Recognised input:
//!   1 | a         – ACCEPT the item at inspection
//!   0 | r         – REJECT the item at inspection
//!   /status       – print the line status
//!   /help         – show this list
//!   /quit | /exit – stop the run

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::warn;

use inspectline_runtime::DecisionSender;
use inspectline_types::Decision;

/// One line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Verdict(Decision),
    Status,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a prompt line.  Blank input yields `None`.
pub fn parse(line: &str) -> Option<Command> {
    let cmd = line.trim();
    if cmd.is_empty() {
        return None;
    }
    Some(match cmd.to_ascii_lowercase().as_str() {
        "1" | "a" => Command::Verdict(Decision::Accept),
        "0" | "r" => Command::Verdict(Decision::Reject),
        "/status" => Command::Status,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(cmd.to_string()),
    })
}

/// Start the prompt thread.
///
/// Verdicts go to `decisions`; `/status` requests go to `status`.  The
/// thread sets `shutdown` on `/quit`, Ctrl-C or end of input.
pub fn spawn(
    decisions: DecisionSender,
    status: mpsc::Sender<()>,
    shutdown: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("inspectline-prompt".to_string())
        .spawn(move || run(decisions, status, shutdown))
}

fn run(decisions: DecisionSender, status: mpsc::Sender<()>, shutdown: Arc<AtomicBool>) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            warn!(error = %e, "prompt unavailable; no verdicts can be entered");
            return;
        }
    };

    while !shutdown.load(Ordering::SeqCst) {
        let line = match editor.readline("inspect> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
        };

        let Some(cmd) = parse(&line) else {
            continue;
        };
        let _ = editor.add_history_entry(line.trim());

        match cmd {
            Command::Verdict(decision) => {
                if !decisions.send(decision) {
                    break;
                }
            }
            Command::Status => {
                if status.send(()).is_err() {
                    break;
                }
            }
            Command::Help => print_help(),
            Command::Quit => {
                println!("{}", "Stopping the line.".green());
                shutdown.store(true, Ordering::SeqCst);
                break;
            }
            Command::Unknown(other) => {
                println!(
                    "{} '{}'. Type {} for available commands.",
                    "Unknown command:".red(),
                    other.yellow(),
                    "/help".bold()
                );
            }
        }
    }
}

pub fn print_help() {
    println!();
    println!("{}", "InspectLine Commands".bold().underline());
    println!("  {}        – accept the item at inspection", "1  a".bold().cyan());
    println!("  {}        – reject the item at inspection", "0  r".bold().cyan());
    println!("  {}     – show line status", "/status".bold().cyan());
    println!("  {} – stop the run", "/quit  /exit".bold().cyan());
    println!();
}
