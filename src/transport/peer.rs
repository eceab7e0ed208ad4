// SPDX-License-Identifier: MIT

//! Per-connection handling: read loop, framing, dispatch, and a dedicated
//! writer activity draining the peer's broadcast-hub queue so broadcasts
//! and direct replies never interleave mid-message.

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::door::Simulator;
use crate::protocol::framing::{FrameEvent, Framer};
use crate::protocol::{message, registry};

/// A connection lifecycle event a host can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerEvent {
    Connected,
    Disconnected,
}

/// An optional host-provided hook fired on peer attach and detach, the way
/// an embedding host would watch connection lifecycle without polling.
pub type PeerObserver = Arc<dyn Fn(PeerEvent, SocketAddr) + Send + Sync>;

/// Drive one accepted connection until EOF, a write failure, or shutdown.
pub async fn handle(
    sim: Arc<Simulator>,
    stream: TcpStream,
    addr: SocketAddr,
    max_frame_bytes: usize,
    shutdown: CancellationToken,
    observer: Option<PeerObserver>,
) {
    let (peer_id, outbound_rx) = sim.hub.register().await;
    if let Some(observer) = &observer {
        observer(PeerEvent::Connected, addr);
    }
    let (read_half, write_half) = stream.into_split();
    let cancel = shutdown.child_token();

    let writer = tokio::spawn(run_writer(write_half, outbound_rx, cancel.clone()));

    run_reader(&sim, read_half, addr, max_frame_bytes, peer_id, cancel).await;

    sim.hub.unregister(peer_id).await;
    writer.abort();
    if let Some(observer) = &observer {
        observer(PeerEvent::Disconnected, addr);
    }
    tracing::info!(peer = %addr, "peer disconnected");
}

async fn run_writer(
    mut write_half: tokio::net::tcp::OwnedWriteHalf,
    mut outbound_rx: tokio::sync::mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = outbound_rx.recv() => {
                match next {
                    Some(payload) => {
                        if write_half.write_all(payload.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }
}

async fn run_reader(
    sim: &Arc<Simulator>,
    mut read_half: tokio::net::tcp::OwnedReadHalf,
    addr: SocketAddr,
    max_frame_bytes: usize,
    peer_id: crate::transport::hub::PeerId,
    cancel: CancellationToken,
) {
    let mut framer = Framer::new(max_frame_bytes);
    let mut buf = [0u8; 4096];

    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => return,
            result = read_half.read(&mut buf) => match result {
                Ok(n) => n,
                Err(e) => {
                    tracing::debug!(peer = %addr, err = %e, "read error");
                    return;
                }
            },
        };
        if n == 0 {
            return;
        }
        framer.push(&buf[..n]);

        loop {
            match framer.next_frame() {
                Some(FrameEvent::Object(bytes)) => {
                    dispatch_frame(sim, &bytes, peer_id, addr).await;
                }
                Some(FrameEvent::Overflow) => {
                    tracing::warn!(peer = %addr, "frame exceeded max size, closing connection");
                    return;
                }
                None => break,
            }
        }
    }
}

async fn dispatch_frame(sim: &Arc<Simulator>, bytes: &[u8], peer_id: crate::transport::hub::PeerId, addr: SocketAddr) {
    match serde_json::from_slice::<Value>(bytes) {
        Ok(value) => {
            let reply = registry::dispatch(sim, value).await;
            sim.hub.send_to(peer_id, message::to_json(&reply)).await;
        }
        Err(e) => {
            tracing::warn!(peer = %addr, err = %e, "skipping malformed frame");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::net::TcpListener;

    use super::*;
    use crate::config::SimConfig;

    #[tokio::test]
    async fn observer_sees_connect_and_disconnect() {
        let sim = Simulator::new(&SimConfig::for_tests());
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");

        let connects = Arc::new(AtomicUsize::new(0));
        let disconnects = Arc::new(AtomicUsize::new(0));
        let (c, d) = (connects.clone(), disconnects.clone());
        let observer: PeerObserver = Arc::new(move |event, _addr| match event {
            PeerEvent::Connected => {
                c.fetch_add(1, Ordering::SeqCst);
            }
            PeerEvent::Disconnected => {
                d.fetch_add(1, Ordering::SeqCst);
            }
        });

        let accepted = tokio::spawn(async move { listener.accept().await.expect("accept") });
        let client = TcpStream::connect(addr).await.expect("connect");
        let (stream, peer_addr) = accepted.await.expect("accept task");

        let cancel = CancellationToken::new();
        let child = cancel.child_token();
        let peer_task = tokio::spawn(handle(sim, stream, peer_addr, 65536, child, Some(observer)));

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        drop(client);
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);

        cancel.cancel();
        let _ = peer_task.await;
    }
}
