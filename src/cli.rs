//! CLI definition for task-manager-api.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Task Manager REST API server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: ./task-manager.yaml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database URL, e.g. sqlite://data/tasks.db (overrides config and DATABASE_URL)
    #[arg(short, long)]
    pub database: Option<String>,

    /// Address to bind (overrides config and HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2")]
    pub log: String,
}

impl Cli {
    /// Apply flag overrides on top of a resolved config.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(database) = &self.database {
            config.database.url = Some(database.clone());
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
