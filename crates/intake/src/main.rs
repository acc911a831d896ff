// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Intake - scripted sales-intake bot for one-to-one messaging.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;
mod sweep;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use intake_config::IntakeConfig;

/// Intake - scripted sales-intake bot for one-to-one messaging.
#[derive(Parser, Debug)]
#[command(name = "intake", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file only, instead of the layered search.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the dialogue engine, maintenance scheduler and gateway.
    Serve,
    /// Run one housekeeping pass against the database and exit.
    Sweep {
        /// Run the nightly state reset instead of stale-session eviction.
        #[arg(long)]
        nightly: bool,
    },
    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate configuration and report problems.
    Check,
    /// Print the effective configuration with secrets masked.
    Show,
}

fn load_config(path: Option<&PathBuf>) -> IntakeConfig {
    let loaded = match path {
        Some(path) => intake_config::load_and_validate_path(path),
        None => intake_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            intake_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    match cli.command {
        Some(Commands::Serve) => {
            serve::init_tracing(&config.bot.log_level);
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("intake: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Sweep { nightly }) => {
            serve::init_tracing(&config.bot.log_level);
            match sweep::run_sweep(&config, nightly).await {
                Ok(report) => println!(
                    "intake sweep: {:?} affected {} session(s)",
                    report.kind, report.affected
                ),
                Err(e) => {
                    eprintln!("intake: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some(Commands::Config {
            action: ConfigCommand::Check,
        }) => {
            println!("intake: config OK (bot.name={})", config.bot.name);
        }
        Some(Commands::Config {
            action: ConfigCommand::Show,
        }) => match intake_config::render_effective(&config) {
            Ok(rendered) => print!("{rendered}"),
            Err(e) => {
                intake_config::render_errors(&[e]);
                std::process::exit(1);
            }
        },
        None => {
            println!("intake: use --help for available commands");
        }
    }
}
