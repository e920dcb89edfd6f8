// Outbound peer delivery

use crate::network::Message;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Per-peer connect/write budget. A slow peer must never stall the
/// broadcaster beyond this.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Deliver one message to one peer, fire-and-forget.
///
/// Opens a connection, writes the wire line, and closes. Any failure is
/// reported to the caller as this peer's delivery failure; it never affects
/// delivery to other peers.
pub async fn send_message(addr: SocketAddr, message: &Message) -> Result<(), String> {
    let line = message.to_wire_line()?;

    let mut stream = timeout(SEND_TIMEOUT, TcpStream::connect(addr))
        .await
        .map_err(|_| format!("Connect to {} timed out", addr))?
        .map_err(|e| format!("Failed to connect to {}: {}", addr, e))?;

    timeout(SEND_TIMEOUT, async {
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| format!("Failed to send to {}: {}", addr, e))?;
        stream
            .shutdown()
            .await
            .map_err(|e| format!("Failed to close stream to {}: {}", addr, e))
    })
    .await
    .map_err(|_| format!("Send to {} timed out", addr))?
}

/// Fan a message out to every peer. One peer's failure is recorded and the
/// fan-out continues; the returned list names the unreachable peers.
pub async fn broadcast(peers: &[SocketAddr], message: &Message) -> Vec<(SocketAddr, String)> {
    let mut failures = Vec::new();
    for &peer in peers {
        if let Err(e) = send_message(peer, message).await {
            log::warn!("Peer {} unreachable: {}", peer, e);
            failures.push((peer, e));
        }
    }
    failures
}
