mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use config::Config;
use oid::TypeRegistry;
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Config,
    /// Standard registry minus the types disabled in config
    pub registry: TypeRegistry,
    /// `--store` override; `[store] path` or the state dir otherwise
    pub store: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "oidsync", &mut io::stdout());
        return Ok(());
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let registry = config.registry()?;

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config,
        registry,
        store: cli.store,
    };

    match cli.command {
        Command::Types => commands::types::run(&ctx),
        Command::Oid(cmd) => commands::reference::run(&ctx, cmd),
        Command::Value(cmd) => commands::value::run(&ctx, cmd),
        Command::Grants(cmd) => commands::grants::run(&ctx, cmd),
        Command::Completions { .. } => Ok(()),
    }
}
