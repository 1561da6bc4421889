pub mod args;
pub mod handlers;

use anyhow::{Context, Result};
use confab_runtime::{Config, Registry};
use std::path::PathBuf;

pub use args::{Cli, Command};

pub fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.debug);

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let registry = Registry::from_config(&config);

    match cli.command {
        Command::Sessions { project, json } => {
            handlers::sessions(&registry, &resolve_project(project)?, json)
        }
        Command::Messages {
            adapter,
            session,
            json,
        } => handlers::messages(&registry, &adapter, &session, json),
        Command::Usage { adapter, session } => handlers::usage(&registry, &adapter, &session),
        Command::Detect { project } => handlers::detect(&registry, &resolve_project(project)?),
        Command::Watch { project } => handlers::watch(&registry, &resolve_project(project)?),
    }
}

fn resolve_project(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("cannot determine current directory"),
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default_filter = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
