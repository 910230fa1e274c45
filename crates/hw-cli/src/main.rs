use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hw_cli::commands::{heatmap, homework, import, plan, status};
use hw_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(hw_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    config
        .inference
        .validate()
        .context("invalid inference configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = hw_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let now = Utc::now();
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Import { kind }) => {
            let (mut db, config) = open_database(cli.config.as_deref())?;
            let inserted = import::run(io::stdin().lock(), &mut db, &config, *kind)?;
            eprintln!("Imported {inserted} rows");
        }
        Some(Commands::Homework {
            clients,
            window,
            events,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            homework::run(&mut stdout, &db, &config, clients, window, events, now)?;
        }
        Some(Commands::Heatmap(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            heatmap::run(&mut stdout, &db, &config, args, now)?;
        }
        Some(Commands::PlanContext { client, period }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            plan::run(&mut stdout, &db, &config, client, period, now)?;
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut stdout, &db, &config.database_path)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
