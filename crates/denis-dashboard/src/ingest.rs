//! Ingestion listener for controller topology snapshots.
//!
//! The controller opens a TCP connection, writes one JSON snapshot and
//! closes its send side. Connections are served one at a time. A snapshot
//! that fails to decode or validate is logged and dropped; the installed
//! topology is only ever replaced by a complete, valid snapshot.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use denis_topology::{InstallReport, TopologyStore};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::{DashboardEvent, EventBus, TopologyView};
use crate::shutdown::StopSignal;
use crate::wire;

/// Back-off after a failed accept, so persistent errors do not spin.
pub const ACCEPT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

const READ_CHUNK: usize = 5 * 1024;

/// Sequential snapshot listener.
pub struct IngestListener {
    listener: TcpListener,
    store: Arc<TopologyStore>,
    events: EventBus,
    max_message_bytes: usize,
}

impl IngestListener {
    /// Bind the listen address.
    pub async fn bind(
        addr: SocketAddr,
        store: Arc<TopologyStore>,
        events: EventBus,
        max_message_bytes: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Listening for topology snapshots on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            store,
            events,
            max_message_bytes,
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and process connections until `stop` is raised.
    ///
    /// Per-connection failures are logged and never end the loop.
    pub async fn run(self, stop: StopSignal) -> Result<()> {
        loop {
            let accepted = tokio::select! {
                _ = stop.stopped() => break,
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    info!("Controller connected from {}", peer);
                    match self.handle_connection(stream, &stop).await {
                        Ok(Some(report)) => {
                            debug!(version = report.version, "snapshot from {} installed", peer);
                        }
                        Ok(None) => debug!("Connection from {} closed without a snapshot", peer),
                        Err(Error::Connection(e)) => warn!("Connection error from {}: {}", peer, e),
                        Err(e) => warn!("Rejected snapshot from {}: {}", peer, e),
                    }
                }
                Err(e) => {
                    warn!("Failed to accept controller connection: {}", e);
                    tokio::select! {
                        _ = stop.stopped() => break,
                        _ = tokio::time::sleep(ACCEPT_RETRY_INTERVAL) => {}
                    }
                }
            }
        }

        info!("Ingestion listener stopped");
        Ok(())
    }

    /// Read one snapshot from `stream` and install it.
    ///
    /// Returns `Ok(None)` if the peer sent nothing or the listener was
    /// stopped mid-read. The stream is dropped (closed) on return.
    async fn handle_connection(&self, mut stream: TcpStream, stop: &StopSignal) -> Result<Option<InstallReport>> {
        let Some(payload) = read_payload(&mut stream, stop, self.max_message_bytes).await? else {
            return Ok(None);
        };

        let (nodes, edges) = wire::decode(&payload)?;
        let report = self.store.install_snapshot(nodes, edges)?;

        // Announce exactly what was installed, even if a slice change has
        // already replaced it
        self.events
            .publish(DashboardEvent::TopologyChanged(TopologyView::from(&*report.topology)));
        Ok(Some(report))
    }
}

/// Read until the peer closes its send side.
///
/// Returns `None` for an empty payload or when `stop` is raised first.
async fn read_payload(stream: &mut TcpStream, stop: &StopSignal, limit: usize) -> Result<Option<Vec<u8>>> {
    let mut payload = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            _ = stop.stopped() => return Ok(None),
            read = stream.read(&mut chunk) => read?,
        };
        if read == 0 {
            break;
        }
        if payload.len() + read > limit {
            return Err(Error::Validation(format!("snapshot exceeds {} bytes", limit)));
        }
        payload.extend_from_slice(&chunk[..read]);
    }

    Ok((!payload.is_empty()).then_some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::broadcast;
    use tokio::task::JoinHandle;

    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        addr: SocketAddr,
        store: Arc<TopologyStore>,
        events: EventBus,
        stop: StopSignal,
        task: JoinHandle<Result<()>>,
    }

    async fn start(max_message_bytes: usize) -> Harness {
        let store = Arc::new(TopologyStore::new());
        let events = EventBus::default();
        let listener = IngestListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&store),
            events.clone(),
            max_message_bytes,
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = StopSignal::new();
        let task = tokio::spawn(listener.run(stop.clone()));
        Harness { addr, store, events, stop, task }
    }

    async fn send(addr: SocketAddr, payload: &[u8]) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(payload).await.unwrap();
        let _ = stream.shutdown().await;
        // Wait for the listener to close its side
        let mut rest = Vec::new();
        let _ = stream.read_to_end(&mut rest).await;
    }

    async fn next_topology(rx: &mut broadcast::Receiver<DashboardEvent>) -> TopologyView {
        loop {
            match tokio::time::timeout(WAIT, rx.recv()).await.expect("no event").unwrap() {
                DashboardEvent::TopologyChanged(view) => return view,
                _ => continue,
            }
        }
    }

    async fn finish(h: Harness) {
        h.stop.stop();
        tokio::time::timeout(WAIT, h.task)
            .await
            .expect("listener did not stop")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn installs_snapshot() {
        let h = start(1024 * 1024).await;
        let mut rx = h.events.subscribe();

        send(
            h.addr,
            br#"{"nodes":[{"id":"X"},{"id":"Y","slice":3},{"id":"Z"}],"links":[{"source":"X","target":"Y"}]}"#,
        )
        .await;

        let view = next_topology(&mut rx).await;
        assert_eq!(view.version, 1);
        assert_eq!(view.nodes.len(), 3);

        let topo = h.store.snapshot();
        assert_eq!(topo.node("Y").unwrap().slice, 3);
        assert_eq!(topo.edge_count(), 1);
        finish(h).await;
    }

    #[tokio::test]
    async fn malformed_payload_keeps_state() {
        let h = start(1024 * 1024).await;
        let mut rx = h.events.subscribe();

        send(h.addr, br#"{"nodes":[{"id":"A"}],"links":[]}"#).await;
        next_topology(&mut rx).await;

        send(h.addr, b"{\"nodes\": [ this is not json").await;
        send(h.addr, br#"{"nodes":[{"id":"B"},{"desc":"no id"}],"links":[]}"#).await;
        send(h.addr, br#"{"nodes":[{"id":"C"}],"links":[]}"#).await;

        // Only the last valid snapshot produces an event
        let view = next_topology(&mut rx).await;
        assert_eq!(view.version, 2);
        assert_eq!(view.nodes[0].id, "C");
        assert!(h.store.snapshot().contains("C"));
        finish(h).await;
    }

    #[tokio::test]
    async fn chunked_payload_is_concatenated() {
        let h = start(1024 * 1024).await;
        let mut rx = h.events.subscribe();

        let mut stream = TcpStream::connect(h.addr).await.unwrap();
        stream.write_all(br#"{"nodes":[{"id":"#).await.unwrap();
        stream.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        stream.write_all(br#""P"}],"links":[]}"#).await.unwrap();
        stream.shutdown().await.unwrap();

        let view = next_topology(&mut rx).await;
        assert_eq!(view.nodes[0].id, "P");
        finish(h).await;
    }

    #[tokio::test]
    async fn oversized_payload_rejected() {
        let h = start(64).await;
        let mut rx = h.events.subscribe();

        let big = format!(r#"{{"nodes":[{{"id":"{}"}}],"links":[]}}"#, "x".repeat(200));
        send(h.addr, big.as_bytes()).await;
        send(h.addr, br#"{"nodes":[{"id":"ok"}]}"#).await;

        let view = next_topology(&mut rx).await;
        assert_eq!(view.nodes[0].id, "ok");
        assert_eq!(view.version, 1);
        finish(h).await;
    }

    #[tokio::test]
    async fn empty_connection_is_ignored() {
        let h = start(1024).await;
        send(h.addr, b"").await;
        assert_eq!(h.store.version(), 0);
        finish(h).await;
    }

    #[tokio::test]
    async fn stop_interrupts_open_connection() {
        let h = start(1024).await;

        // Connected but never closes its send side
        let mut stream = TcpStream::connect(h.addr).await.unwrap();
        stream.write_all(br#"{"nodes":"#).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let store = Arc::clone(&h.store);
        finish(h).await;
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn stop_twice_is_harmless() {
        let h = start(1024).await;
        h.stop.stop();
        finish(h).await;
    }
}
