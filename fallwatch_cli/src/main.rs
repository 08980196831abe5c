#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `fallwatch`: runs the fall detector against the IMU, a simulated IMU or a
//! recorded trace, and writes confirmed falls as JSON lines.

mod cli;
mod commands;
mod error_fmt;
mod events;
mod logging;
mod rt;
mod watchdog;

use clap::Parser;
use fallwatch_core::EngineError;
use std::time::Duration;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // Only affects how reports are rendered in debug logs.
    let _ = color_eyre::install();

    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(err) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&err));
        } else {
            eprintln!("{}", humanize(&err));
        }
        tracing::debug!(error = ?err, "exiting with error");
        std::process::exit(exit_code_for_error(&err));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let cfg = fallwatch_config::load_file(&cli.config)
        .map_err(|e| EngineError::Config(format!("{e:#}")))?;

    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = ?cli.config, "config loaded");

    match cli.cmd {
        Commands::Run {
            scenario,
            duration_s,
            stats,
            rt,
        } => commands::run(
            &cfg,
            scenario,
            duration_s.map(Duration::from_secs),
            stats,
            rt,
        ),
        Commands::Replay { trace, stats } => commands::replay(&cfg, &trace, stats),
        Commands::SelfCheck { scenario } => commands::self_check(&cfg, scenario),
        Commands::PrintConfig => commands::print_config(cfg),
    }
}
