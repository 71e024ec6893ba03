//! Recall CLI Binary
//!
//! Entry point for the prompt-submit hook and its maintenance commands.
//! `recall prompt` never fails the host: every error ends in a silent exit 0.

use clap::Parser;
use recall::config::ConfigLoader;
use recall::logging::init_logging;
use recall::tooling::cli::{Cli, CliContext, Commands};
use std::process;

fn main() {
    let cli = Cli::parse();
    let is_hook = matches!(cli.command, Commands::Prompt);

    let config = ConfigLoader::load(cli.config.as_deref());

    // Logging comes up before anything else can fail; a broken logging
    // setup must not take the hook down with it.
    let logging = match &config {
        Ok(Some(config)) => config.logging.clone(),
        _ => Default::default(),
    }
    .with_overrides(&cli.logging_overrides());
    if let Err(e) = init_logging(Some(&logging)) {
        if !is_hook {
            eprintln!("Warning: logging disabled: {}", e);
        }
    }

    let config = match config {
        Ok(Some(config)) => config,
        Ok(None) => {
            if is_hook {
                process::exit(0);
            }
            eprintln!("Error: recall is not configured (peer_name, api_key and workspace are required)");
            process::exit(1);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load configuration");
            if is_hook {
                process::exit(0);
            }
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to start async runtime");
            process::exit(if is_hook { 0 } else { 1 });
        }
    };

    let context = match CliContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to initialize");
            if is_hook {
                process::exit(0);
            }
            eprintln!("Error initializing: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(context.execute(&cli.command)) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            tracing::warn!(command = cli.command.name(), error = %e, "Command failed");
            if is_hook {
                process::exit(0);
            }
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
