//! REPL – asks for the user's name once, then takes instructions until
//! `stop`, end of input, or Ctrl-C.

use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::runtime::Runtime;

use nao_hal::SimHandle;
use nao_runtime::{Status, TurnReport, is_stop_command};

use crate::config::Config;
use crate::session;

/// Entry point for the interactive loop.
///
/// `shutdown` is checked before every prompt, so a Ctrl-C during a turn lets
/// the turn finish and then ends the session.
pub fn run(cfg: &Config, runtime: &Runtime, shutdown: Arc<AtomicBool>) -> Result<(), String> {
    let mut editor =
        DefaultEditor::new().map_err(|e| format!("Failed to open the terminal: {e}"))?;

    let Some(username) = read_username(&mut editor)? else {
        return Ok(());
    };
    let (mut conversation, robot) = session::build(cfg, &username)?;
    println!(
        "\n  Hello {}! Type an instruction for NAO, or {} to end.\n",
        username.bold(),
        "stop".bold().cyan()
    );

    let mut journal_seen = 0;
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        let line = match editor.readline(&format!("{} ", "nao>".bold().cyan())) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {}", "Read error".red(), e);
                break;
            }
        };

        let instruction = line.trim();
        if instruction.is_empty() {
            continue;
        }
        let _ = editor.add_history_entry(instruction);

        if is_stop_command(instruction) {
            break;
        }

        let report = runtime.block_on(conversation.handle_turn(instruction));
        journal_seen = print_robot_activity(&robot, journal_seen);
        print_report(&report);
    }

    println!("{}", "Stopping the NAO robot.".green());
    Ok(())
}

fn read_username(editor: &mut DefaultEditor) -> Result<Option<String>, String> {
    loop {
        match editor.readline("  What is your name? ") {
            Ok(name) if !name.trim().is_empty() => return Ok(Some(name.trim().to_string())),
            Ok(_) => continue,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(format!("Failed to read the user name: {e}")),
        }
    }
}

/// Print journal entries recorded since `seen`; returns the new count.
fn print_robot_activity(robot: &SimHandle, seen: usize) -> usize {
    let calls = robot.calls();
    for call in calls.iter().skip(seen) {
        if call.detail.is_empty() {
            println!("  {} {}", "🤖".cyan(), call.action.to_string().bold());
        } else {
            println!(
                "  {} {} {}",
                "🤖".cyan(),
                call.action.to_string().bold(),
                call.detail.dimmed()
            );
        }
    }
    calls.len()
}

fn print_report(report: &TurnReport) {
    for line in &report.status {
        match line {
            Status::Info(m) => println!("  {}", m.dimmed()),
            Status::Warning(m) => println!("  {} {}", "⚠".yellow(), m.yellow()),
            Status::Failure(m) => println!("  {} {}", "✗".red().bold(), m.red()),
        }
    }
    println!();
}
