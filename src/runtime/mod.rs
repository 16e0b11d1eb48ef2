//! Chat runtime.
//!
//! Building blocks shared by both roles:
//! - `Connection`: duplex stream with a once-only close
//! - `ChunkBuffer`: fixed-capacity buffer, one read per message
//! - `InputSource`: operator lines from the terminal
//! - `DuplexSession`: concurrent send and receive over one connection
//! - `ConnectionAcceptor`: serial accept loop for the server
//!
//! All user-visible output flows through `EventSink` to a console task.

mod acceptor;
mod buffer;
mod client;
mod connection;
mod event;
mod input;
mod protocol;
mod session;

use crate::config::{Config, Role};
use crate::shutdown::ShutdownSignal;
use acceptor::{bind_listener, ConnectionAcceptor};
use event::{ChatEvent, EventSink};
use input::InputSource;
use session::DuplexSession;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tracing::{info, warn};

/// Run the configured role to completion.
pub fn run(config: Config) -> io::Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.build()?;

    runtime.block_on(async move {
        let shutdown = ShutdownSignal::new();
        shutdown.listen_for_interrupt();

        let (events, rx) = EventSink::channel();
        let console = event::spawn_console(rx);

        let result = match config.role.clone() {
            Role::Server { host, port } => run_server(&config, &host, port, shutdown, events).await,
            Role::Client { address, port } => {
                run_client(&config, &address, port, shutdown, events).await
            }
        };

        // All sinks are dropped at this point; let queued output drain.
        if let Err(e) = console.await {
            warn!(error = %e, "Console task failed");
        }
        result
    })
}

async fn run_server(
    config: &Config,
    host: &str,
    port: u16,
    shutdown: ShutdownSignal,
    events: EventSink,
) -> io::Result<()> {
    let ip: IpAddr = host.parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid bind address '{host}': {e}"),
        )
    })?;
    let addr = SocketAddr::new(ip, port);

    let listener = bind_listener(addr, config.backlog, config.reuse_address)?;
    info!(addr = %addr, backlog = config.backlog, "Server listening");

    let acceptor = ConnectionAcceptor::new(listener, config.buffer_size, shutdown, events);
    let mut input = InputSource::stdin();
    acceptor.serve(&mut input).await;
    Ok(())
}

async fn run_client(
    config: &Config,
    address: &str,
    port: u16,
    shutdown: ShutdownSignal,
    events: EventSink,
) -> io::Result<()> {
    let conn = tokio::select! {
        conn = client::connect(address, port) => conn?,
        _ = shutdown.triggered() => {
            info!("Shutdown requested before connecting");
            return Ok(());
        }
    };
    let peer = conn.peer();
    info!(peer = %peer, "Connected to server");
    events.emit(ChatEvent::Connected { peer });

    let mut input = InputSource::stdin();
    let session = DuplexSession::new(conn, config.buffer_size, shutdown, events);
    session.run(&mut input).await;
    Ok(())
}
