//! Configuration module for tcp-chat.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

/// Command-line arguments for the chat program
#[derive(Parser, Debug)]
#[command(name = "tcp-chat")]
#[command(author = "tcp-chat authors")]
#[command(version = "0.1.0")]
#[command(about = "Bidirectional terminal chat over one TCP connection", long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub role: RoleArgs,

    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Capacity of each per-direction I/O buffer in bytes
    #[arg(short = 'b', long, global = true)]
    pub buffer_size: Option<usize>,

    /// Number of worker threads (defaults to number of CPU cores)
    #[arg(short = 'w', long, global = true)]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,
}

/// Which end of the chat this process plays.
#[derive(Subcommand, Debug, Clone)]
pub enum RoleArgs {
    /// Accept chat sessions, one client at a time
    Server {
        /// Port to listen on
        port: u16,

        /// Address to bind to (e.g., 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
    },
    /// Connect to a chat server
    Client {
        /// Server host name or address
        address: String,

        /// Server port
        port: u16,
    },
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen backlog
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    /// Set SO_REUSEADDR on the listening socket
    #[serde(default = "default_reuse_address")]
    pub reuse_address: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            backlog: default_backlog(),
            reuse_address: default_reuse_address(),
        }
    }
}

/// Chat session configuration
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Capacity of each per-direction buffer in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

/// Async runtime configuration
#[derive(Debug, Deserialize, Default)]
pub struct RuntimeConfig {
    /// Number of worker threads
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const DEFAULT_LOG_LEVEL: &str = "warn";

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_backlog() -> i32 {
    5
}

fn default_reuse_address() -> bool {
    true
}

fn default_buffer_size() -> usize {
    1024
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Resolved role with its connection parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Server { host: String, port: u16 },
    Client { address: String, port: u16 },
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub backlog: i32,
    pub reuse_address: bool,
    pub buffer_size: usize,
    pub workers: Option<usize>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Resolve already-parsed CLI arguments against the optional TOML file.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        Self::merge(cli, toml_config)
    }

    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Result<Self, ConfigError> {
        let role = match cli.role {
            RoleArgs::Server { port, host } => Role::Server {
                host: host.unwrap_or(toml_config.server.host),
                port,
            },
            RoleArgs::Client { address, port } => Role::Client { address, port },
        };

        let config = Config {
            role,
            backlog: toml_config.server.backlog,
            reuse_address: toml_config.server.reuse_address,
            buffer_size: cli.buffer_size.unwrap_or(toml_config.session.buffer_size),
            workers: cli.workers.or(toml_config.runtime.workers),
            log_level: if cli.log_level != DEFAULT_LOG_LEVEL {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::Invalid("buffer_size", "must be greater than 0"));
        }
        if self.backlog <= 0 {
            return Err(ConfigError::Invalid("backlog", "must be greater than 0"));
        }
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
    Invalid(&'static str, &'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::Invalid(field, reason) => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
