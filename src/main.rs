//! token-saver: command output compressor for AI coding agents
//!
//! Routes captured command output through a registry of priority-ordered
//! processors, and hooks into Claude Code so compressible Bash commands run
//! through `token-saver wrap`.

mod cli;
mod config;
mod domain;
mod service;

use std::process;

use anyhow::{bail, Result};
use clap::Parser;

use cli::{Cli, Commands};
use config::{Config, ConfigService};
use domain::processors::PriorityBand;
use domain::{Engine, Registry};
use service::{resolve_session_id, CompressService, HookService, SavingsTracker, SessionService};

fn main() -> Result<()> {
    let cli = Cli::parse();
    domain::install_panic_hook();

    // Fail open: a broken setup must never block the agent's tool call
    // or its session start
    if matches!(cli.command, Commands::Hook | Commands::Session) {
        let outcome = match cli.command {
            Commands::Session => run_session_hook(&cli),
            _ => run_hook(&cli),
        };
        if let Err(e) = outcome {
            eprintln!("token-saver: {:#}", e);
        }
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Hook | Commands::Session => {}
        Commands::Wrap { command, session } => {
            let mut service =
                CompressService::new(Engine::new(Registry::discover(&config)?), &config);
            if config.track_savings {
                service = service.with_tracker(SavingsTracker::new(
                    &config.savings_path,
                    resolve_session_id(session.as_deref()),
                ));
            }
            let code = service.wrap(&command.join(" "))?;
            process::exit(code);
        }
        Commands::Stats { session, json } => {
            let tracker =
                SavingsTracker::new(&config.savings_path, resolve_session_id(session.as_deref()));
            let stats = tracker.stats()?;
            if json {
                println!("{}", serde_json::to_string(&stats.to_json())?);
            } else {
                println!("{}", stats.render());
                if !cli.quiet {
                    eprintln!("Savings file: {}", tracker.path().display());
                }
            }
        }
        Commands::Compress { command, json } => {
            let service = CompressService::new(Engine::new(Registry::discover(&config)?), &config);
            service.compress_stdin(&command, json)?;
        }
        Commands::Patterns { json } => {
            let patterns = Registry::discover(&config)?.collect_patterns();
            if json {
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            } else {
                for pattern in patterns {
                    println!("{}", pattern);
                }
            }
        }
        Commands::Processors => {
            let registry = Registry::discover(&config)?;
            for processor in registry.snapshot().processors() {
                let band = PriorityBand::of(processor.priority())
                    .map(|band| band.to_string())
                    .unwrap_or_default();
                println!(
                    "{:>4}  {:<14}{}",
                    processor.priority(),
                    processor.name(),
                    band
                );
            }
        }
        Commands::Init { path } => {
            let config_path = if let Some(p) = path {
                ConfigService::generate_at(&p)?;
                p
            } else {
                ConfigService::generate_default()?;
                ConfigService::default_path()
            };
            if !cli.quiet {
                eprintln!("Configuration file created at: {}", config_path.display());
            }
        }
        Commands::Check => {
            config::validate(&config)?;
            let engine = Engine::new(Registry::discover(&config)?);
            let first = engine.registry().snapshot();
            // Rediscovery must yield the same routing order
            engine.registry().refresh()?;
            let second = engine.registry().snapshot();
            if first.names() != second.names() {
                bail!(
                    "Processor discovery is not deterministic: [{}] then [{}]",
                    first.names().join(", "),
                    second.names().join(", ")
                );
            }
            if !cli.quiet {
                eprintln!(
                    "Configuration is valid. {} processors registered.",
                    second.processors().len()
                );
            }
        }
        Commands::Version => {
            println!("token-saver {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Load configuration and start file logging when debug is enabled.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = ConfigService::load(cli.config.as_deref())?;
    if cli.debug || config.debug {
        domain::logger::init(&config)?;
    }
    Ok(config)
}

fn run_hook(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    let registry = Registry::discover(&config)?;
    let executable = std::env::current_exe()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "token-saver".to_string());
    HookService::new(registry, executable).run()
}

fn run_session_hook(cli: &Cli) -> Result<()> {
    let config = load_config(cli)?;
    SessionService::new(config).run()
}
