//! HTTP and WebSocket surface for the presentation layer.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use denis_topology::{is_valid_slice, TopologyStore};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::events::{AnalyticsReport, DashboardEvent, EventBus, TopologyView};
use crate::monitor::{Monitor, MonitorState};
use crate::shutdown::StopSignal;

/// Handles shared by the API and the service.
///
/// This is the command surface the presentation layer writes through.
#[derive(Clone)]
pub struct DashboardState {
    pub store: Arc<TopologyStore>,
    pub monitor: Arc<Monitor>,
    pub events: EventBus,
}

impl DashboardState {
    /// Move a node to another slice and notify subscribers.
    pub fn set_slice(&self, node: &str, slice: i64) -> Result<u64> {
        if !is_valid_slice(slice) {
            return Err(Error::Validation(format!("slice {} out of range 1..=16", slice)));
        }
        let slice = slice as u8;
        let version = self.store.set_slice(node, slice)?;
        self.events.publish(DashboardEvent::SliceChanged {
            node: node.to_string(),
            slice,
            version,
        });
        Ok(version)
    }

    pub fn topology(&self) -> TopologyView {
        TopologyView::from(&*self.store.snapshot())
    }

    pub fn status(&self) -> StatusResponse {
        let topology = self.store.snapshot();
        StatusResponse {
            status: "ok",
            version: topology.version(),
            node_count: topology.len(),
            edge_count: topology.edge_count(),
            border: self.monitor.border().to_string(),
            monitor: self.monitor.state(),
            period_secs: self.monitor.period().as_secs(),
            last_tick_version: self.monitor.latest().map(|r| r.version),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) | Error::Configuration(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Connection(_) | Error::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Server status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: u64,
    pub node_count: usize,
    pub edge_count: usize,
    pub border: String,
    pub monitor: MonitorState,
    pub period_secs: u64,
    pub last_tick_version: Option<u64>,
}

/// Build the router for the API.
pub fn router(state: DashboardState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/topology", get(topology_handler))
        .route("/api/analytics", get(analytics_handler))
        .route("/api/nodes/{id}/slice", post(slice_handler))
        .route("/api/monitor/start", post(monitor_start_handler))
        .route("/api/monitor/stop", post(monitor_stop_handler))
        .route("/api/monitor/run", post(monitor_run_handler))
        .route("/api/monitor/period", post(monitor_period_handler))
        // WebSocket for real-time updates
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on an already-bound listener until `stop` is raised.
pub async fn serve(listener: tokio::net::TcpListener, state: DashboardState, stop: StopSignal) -> Result<()> {
    info!("Dashboard API running on http://{}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { stop.stopped().await })
        .await?;
    Ok(())
}

async fn status_handler(State(state): State<DashboardState>) -> Json<StatusResponse> {
    Json(state.status())
}

async fn topology_handler(State(state): State<DashboardState>) -> Json<TopologyView> {
    Json(state.topology())
}

async fn analytics_handler(State(state): State<DashboardState>) -> Result<Json<AnalyticsReport>> {
    state
        .monitor
        .latest()
        .map(|report| Json((*report).clone()))
        .ok_or_else(|| Error::NotFound("no analytics yet".into()))
}

#[derive(Deserialize)]
struct SliceRequest {
    slice: i64,
}

#[derive(Serialize)]
struct SliceResponse {
    node: String,
    slice: i64,
    version: u64,
}

async fn slice_handler(
    State(state): State<DashboardState>,
    Path(id): Path<String>,
    Json(req): Json<SliceRequest>,
) -> Result<Json<SliceResponse>> {
    let version = state.set_slice(&id, req.slice)?;
    Ok(Json(SliceResponse {
        node: id,
        slice: req.slice,
        version,
    }))
}

#[derive(Serialize)]
struct MonitorResponse {
    changed: bool,
    state: MonitorState,
}

async fn monitor_start_handler(State(state): State<DashboardState>) -> Json<MonitorResponse> {
    let changed = state.monitor.start();
    Json(MonitorResponse {
        changed,
        state: state.monitor.state(),
    })
}

async fn monitor_stop_handler(State(state): State<DashboardState>) -> Json<MonitorResponse> {
    let changed = state.monitor.stop();
    Json(MonitorResponse {
        changed,
        state: MonitorState::Idle,
    })
}

async fn monitor_run_handler(State(state): State<DashboardState>) -> Result<Json<AnalyticsReport>> {
    let report = state.monitor.tick().await?;
    Ok(Json((*report).clone()))
}

#[derive(Deserialize)]
struct PeriodRequest {
    minutes: u64,
}

async fn monitor_period_handler(
    State(state): State<DashboardState>,
    Json(req): Json<PeriodRequest>,
) -> Result<Json<StatusResponse>> {
    let secs = match req.minutes.checked_mul(60) {
        Some(secs) if secs > 0 => secs,
        _ => return Err(Error::Validation(format!("invalid period of {} minutes", req.minutes))),
    };
    state.monitor.set_period(Duration::from_secs(secs))?;
    Ok(Json(state.status()))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<DashboardState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: DashboardState) {
    info!("Dashboard client connected");
    let mut rx = state.events.subscribe();

    // Initial state: current topology and latest analytics
    let mut initial = vec![DashboardEvent::TopologyChanged(state.topology())];
    if let Some(report) = state.monitor.latest() {
        initial.push(DashboardEvent::AnalyticsReady((*report).clone()));
    }
    for event in initial {
        if send_event(&mut socket, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            event = rx.recv() => {
                match event {
                    Ok(event) => {
                        if send_event(&mut socket, &event).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("WebSocket client lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }
    info!("Dashboard client disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &DashboardEvent) -> std::result::Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use denis_topology::NodeSpec;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn state() -> DashboardState {
        let store = Arc::new(TopologyStore::new());
        let events = EventBus::default();
        let monitor = Monitor::new(Arc::clone(&store), events.clone(), "X", Duration::from_secs(60)).unwrap();
        DashboardState {
            store,
            monitor: Arc::new(monitor),
            events,
        }
    }

    #[test]
    fn router_builds() {
        let _router = router(state());
    }

    #[test]
    fn set_slice_unknown_node() {
        let state = state();
        state
            .store
            .install_snapshot(vec![NodeSpec::with_id("X")], vec![])
            .unwrap();
        let before = state.store.snapshot();

        let err = state.set_slice("Y", 5).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(*state.store.snapshot(), *before);
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn set_slice_rejects_range() {
        let state = state();
        state
            .store
            .install_snapshot(vec![NodeSpec::with_id("X")], vec![])
            .unwrap();
        let err = state.set_slice("X", 300).unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn set_slice_publishes_event() {
        let state = state();
        state
            .store
            .install_snapshot(vec![NodeSpec::with_id("X")], vec![])
            .unwrap();
        let mut rx = state.events.subscribe();

        assert_eq!(state.set_slice("X", 12).unwrap(), 2);
        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            DashboardEvent::SliceChanged {
                node: "X".into(),
                slice: 12,
                version: 2
            }
        );
    }

    #[test]
    fn status_reflects_store() {
        let state = state();
        state
            .store
            .install_snapshot(vec![NodeSpec::with_id("X"), NodeSpec::with_id("Y")], vec![])
            .unwrap();
        let status = state.status();
        assert_eq!(status.node_count, 2);
        assert_eq!(status.version, 1);
        assert_eq!(status.monitor, MonitorState::Idle);
        assert_eq!(status.period_secs, 60);
        assert_eq!(status.last_tick_version, None);
    }

    async fn http(addr: SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_status_and_slice_requests() {
        let state = state();
        state
            .store
            .install_snapshot(vec![NodeSpec::with_id("X")], vec![])
            .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = StopSignal::new();
        let server = tokio::spawn(serve(listener, state.clone(), stop.clone()));

        let response = http(addr, "GET /api/status HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""node_count":1"#));

        let body = r#"{"slice":5}"#;
        let request = format!(
            "POST /api/nodes/Y/slice HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let response = http(addr, &request).await;
        assert!(response.starts_with("HTTP/1.1 404"));

        let request = request.replace("/Y/", "/X/");
        let response = http(addr, &request).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert_eq!(state.store.snapshot().node("X").unwrap().slice, 5);

        let response = http(addr, "GET /api/analytics HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        let response = http(
            addr,
            "POST /api/monitor/run HTTP/1.1\r\nHost: test\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(r#""border_present":true"#));
        assert_eq!(state.monitor.latest().map(|r| r.version), Some(2));

        stop.stop();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop")
            .unwrap()
            .unwrap();
    }
}
