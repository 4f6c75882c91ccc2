//! Dashboard service - wires the store, listener, monitor and API together.
//!
//! Architecture:
//! - One shared `TopologyStore`, replaced wholesale by each snapshot
//! - Ingestion listener for controller pushes
//! - CODET monitor on its own schedule
//! - HTTP/WebSocket API for the presentation layer

use std::sync::Arc;

use denis_topology::TopologyStore;
use tracing::{error, info};

use crate::config::DashboardConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::ingest::IngestListener;
use crate::monitor::Monitor;
use crate::server::{self, DashboardState};
use crate::shutdown::StopSignal;

/// A dashboard instance.
pub struct Dashboard {
    config: DashboardConfig,
    state: DashboardState,
    stop: StopSignal,
}

impl Dashboard {
    /// Create a dashboard. Fails on invalid configuration.
    pub fn new(config: DashboardConfig) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(TopologyStore::new());
        let events = EventBus::default();
        let monitor = Arc::new(Monitor::new(
            Arc::clone(&store),
            events.clone(),
            config.border_node.clone(),
            config.monitor_period(),
        )?);

        Ok(Self {
            config,
            state: DashboardState { store, monitor, events },
            stop: StopSignal::new(),
        })
    }

    /// Shared handles for embedding or tests.
    pub fn state(&self) -> DashboardState {
        self.state.clone()
    }

    /// Signal that stops every component of this dashboard.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Run until the stop signal is raised.
    pub async fn run(self) -> Result<()> {
        info!("DENIS-SDN dashboard starting");
        info!("  Snapshots: {}", self.config.listen_addr);
        info!("  API: http://{}", self.config.http_addr);
        info!("  Border node: {}", self.config.border_node);
        info!("  CODET period: {} min", self.config.monitor_period_minutes);

        let listener = IngestListener::bind(
            self.config.listen_addr,
            Arc::clone(&self.state.store),
            self.state.events.clone(),
            self.config.max_message_bytes,
        )
        .await?;
        let http = tokio::net::TcpListener::bind(self.config.http_addr).await?;

        let ingest = tokio::spawn(listener.run(self.stop.clone()));
        self.state.monitor.start();

        let served = server::serve(http, self.state.clone(), self.stop.clone()).await;
        if let Err(e) = &served {
            error!("API server error: {}", e);
        }

        // Bring everything down, whichever way we got here
        self.stop.stop();
        self.state.monitor.shutdown().await;
        match ingest.await {
            Ok(Err(e)) => error!("Ingestion listener error: {}", e),
            Err(e) => error!("Ingestion task ended abnormally: {}", e),
            Ok(Ok(())) => {}
        }
        self.state.store.clear();

        info!("DENIS-SDN dashboard stopped");
        served
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::events::DashboardEvent;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    fn test_config() -> DashboardConfig {
        DashboardConfig {
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            http_addr: "127.0.0.1:0".parse().unwrap(),
            border_node: "X".into(),
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn invalid_config_is_fatal() {
        let config = DashboardConfig {
            monitor_period_minutes: 0,
            ..test_config()
        };
        assert!(matches!(Dashboard::new(config), Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn runs_and_stops() {
        let dashboard = Dashboard::new(test_config()).unwrap();
        let stop = dashboard.stop_signal();
        let state = dashboard.state();
        let task = tokio::spawn(dashboard.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.monitor.state(), crate::monitor::MonitorState::Running);

        stop.stop();
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("dashboard did not stop")
            .unwrap()
            .unwrap();
        assert_eq!(state.monitor.state(), crate::monitor::MonitorState::Idle);
    }

    #[tokio::test]
    async fn end_to_end_snapshot_and_analysis() {
        // Bind the ingest listener ourselves to learn its port
        let dashboard = Dashboard::new(test_config()).unwrap();
        let state = dashboard.state();
        let listener = IngestListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&state.store),
            state.events.clone(),
            1024,
        )
        .await
        .unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = dashboard.stop_signal();
        let ingest = tokio::spawn(listener.run(stop.clone()));

        let mut rx = state.events.subscribe();
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(br#"{"nodes":[{"id":"X"},{"id":"Y"},{"id":"Z"}],"links":[{"source":"X","target":"Y"}]}"#)
            .await
            .unwrap();
        stream.shutdown().await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("no topology event")
            .unwrap();
        assert!(matches!(event, DashboardEvent::TopologyChanged(_)));

        let report = state.monitor.run_tick();
        assert_eq!(report.disconnected, vec!["Z"]);

        stop.stop();
        ingest.await.unwrap().unwrap();
    }
}
