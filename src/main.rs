//! tcp-chat: a terminal chat over a single TCP connection
//!
//! Two roles:
//! - `server <port>`: accepts clients one at a time
//! - `client <address> <port>`: connects to a server
//!
//! Features:
//! - Simultaneous send and receive on one connection
//! - Raw byte chunks, no framing; one read is one message
//! - Typing `exit` closes the session (or an idle server)
//! - Ctrl-C shuts every loop down cooperatively
//! - Configuration via CLI arguments or TOML file

mod config;
mod runtime;
mod shutdown;

use config::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging; stdout is reserved for the chat itself
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!(
        role = ?config.role,
        buffer_size = config.buffer_size,
        workers = ?config.workers,
        "Starting tcp-chat"
    );

    runtime::run(config)?;
    Ok(())
}
