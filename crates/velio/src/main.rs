// SPDX-FileCopyrightText: 2026 Velio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Velio - WhatsApp sales assistant for automotive listings.
//!
//! This is the binary entry point for the Velio service.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use clap::{Parser, Subcommand};

/// Velio - WhatsApp sales assistant for automotive listings.
#[derive(Parser, Debug)]
#[command(name = "velio", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Velio service (transport, engine, gateway).
    Serve,
    /// Print the effective configuration after merging all sources.
    Config,
}

#[tokio::main]
async fn main() {
    // Load and validate configuration at startup.
    let config = match velio_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            velio_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("velio serve failed: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("failed to render config: {e}");
                std::process::exit(1);
            }
        },
        None => {
            println!("velio: use --help for available commands");
        }
    }
}
