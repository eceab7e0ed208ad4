// SPDX-License-Identifier: MIT

//! The wire-protocol accept loop: one long-lived activity accepting
//! connections and spawning a task per peer.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::door::Simulator;
use crate::transport::peer;
use crate::transport::peer::PeerObserver;

/// Accept connections on `host:port` until `shutdown` is cancelled, each on
/// its own task. `observer`, if given, is notified of every peer attach and
/// detach.
pub async fn serve(
    sim: Arc<Simulator>,
    host: String,
    port: u16,
    max_frame_bytes: usize,
    shutdown: CancellationToken,
    observer: Option<PeerObserver>,
) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "wire protocol listener bound");
    serve_on(sim, listener, max_frame_bytes, shutdown, observer).await
}

/// Like [`serve`], but against a listener the caller already bound (tests
/// use this to discover the ephemeral port before connecting).
pub async fn serve_on(
    sim: Arc<Simulator>,
    listener: TcpListener,
    max_frame_bytes: usize,
    shutdown: CancellationToken,
    observer: Option<PeerObserver>,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        let sim = Arc::clone(&sim);
                        let shutdown = shutdown.clone();
                        let observer = observer.clone();
                        tracing::info!(peer = %peer_addr, "peer connected");
                        tokio::spawn(peer::handle(sim, stream, peer_addr, max_frame_bytes, shutdown, observer));
                    }
                    Err(e) => tracing::warn!(err = %e, "accept failed"),
                }
            }
        }
    }
    Ok(())
}
