//! CLI argument definitions for the Mindbridge server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use mindbridge_core::config::StorageBackend;

/// Mindbridge: relays Messenger conversations to a dialogue engine.
#[derive(Parser, Debug)]
#[command(name = "mindbridge", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// HTTP server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Session store backend (sqlite, memory).
    #[arg(short = 's', long = "storage")]
    pub storage: Option<StorageBackend>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MINDBRIDGE_CONFIG env var > ~/.mindbridge/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MINDBRIDGE_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the HTTP server port.
    ///
    /// Priority: --port flag > MINDBRIDGE_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("MINDBRIDGE_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    pub fn resolve_storage(&self, config_backend: StorageBackend) -> StorageBackend {
        self.storage.unwrap_or(config_backend)
    }
}

fn default_config_path() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".mindbridge").join("config.toml");
    }
    PathBuf::from("config.toml")
}
