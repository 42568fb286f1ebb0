//! `nao` – talk to a simulated NAO humanoid.
//!
//! 1. Loads `~/.nao/config.toml` (optional) and environment overrides.
//! 2. Asks for the user's name.
//! 3. Reads instructions until `stop`, end of input, or Ctrl-C. Each one is
//!    turned into memory operations and a gesture plan, which the simulated
//!    robot performs.

mod config;
mod repl;
mod session;

use colored::Colorize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

fn main() {
    let _telemetry = nao_runtime::init_tracing("nao");

    print_banner();

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            let mut cfg = config::Config::default();
            config::apply_overrides(&mut cfg, |key| std::env::var(key).ok());
            cfg
        }
    };
    info!(config = ?cfg, "configuration loaded");
    if cfg.openai_api_key.is_empty() {
        println!(
            "  {} {} is not set; NAO will not be able to plan.",
            "Warning:".yellow(),
            "OPENAI_API_KEY".bold()
        );
    }

    // ── Ctrl-C ────────────────────────────────────────────────────────────
    // Mid-turn interrupts are deferred until the turn completes.
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!(
            "{}",
            "⚠  Ctrl-C received – finishing the current turn, then stopping …"
                .yellow()
                .bold()
        );
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start the async runtime".red(), e);
            std::process::exit(1);
        }
    };

    if let Err(e) = repl::run(&cfg, &runtime, shutdown) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}

fn print_banner() {
    println!();
    println!("{}", r#"   _  _____   ____ "#.bold().cyan());
    println!("{}", r#"  / |/ / _ | / __ \"#.bold().cyan());
    println!("{}", r#" /    / __ |/ /_/ /"#.bold().cyan());
    println!("{}", r#"/_/|_/_/ |_|\____/ "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "NAO assistant".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Conversational humanoid with long-term memory");
    println!();
}
