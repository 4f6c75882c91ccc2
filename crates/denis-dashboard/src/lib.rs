//! DENIS-SDN Dashboard Core
//!
//! Keeps a live model of the sliced SDN topology pushed by the DENIS-SDN
//! controller and continuously checks that every node can still reach the
//! border router.
//!
//! # Architecture
//!
//! - **Ingest**: TCP listener installing full JSON snapshots atomically
//! - **Monitor**: CODET + density classifier on a fixed period
//! - **Events**: broadcast bus of topology and analytics notifications
//! - **Server**: HTTP/WebSocket API for the visualization front end
//!
//! # Usage
//!
//! ```no_run
//! use denis_dashboard::{Dashboard, DashboardConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let dashboard = Dashboard::new(DashboardConfig::from_env()?)?;
//!     dashboard.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod ingest;
pub mod monitor;
pub mod server;
pub mod service;
pub mod shutdown;
pub mod wire;

pub use config::DashboardConfig;
pub use error::{Error, Result};
pub use events::{AnalyticsReport, DashboardEvent, EventBus, TopologyView};
pub use ingest::IngestListener;
pub use monitor::{Monitor, MonitorState};
pub use server::DashboardState;
pub use service::Dashboard;
pub use shutdown::StopSignal;
