//! Client side: one outbound connection, one session.

use crate::runtime::connection::Connection;
use std::io;
use tokio::net::TcpStream;
use tracing::debug;

/// Connect to `address:port`, resolving host names if needed.
pub async fn connect(address: &str, port: u16) -> io::Result<Connection> {
    let stream = TcpStream::connect((address, port)).await?;
    stream.set_nodelay(true)?;
    let peer = stream.peer_addr()?;
    debug!(peer = %peer, "Connected");
    Ok(Connection::new(stream, peer))
}
