//! DENIS-SDN Dashboard binary
//!
//! Listens for controller topology snapshots, runs CODET on a schedule and
//! serves the results to the visualization front end.

use denis_dashboard::{Dashboard, DashboardConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "denis_dashboard=info,denis_topology=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DashboardConfig::from_env()?;
    let dashboard = Dashboard::new(config)?;

    let stop = dashboard.stop_signal();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("Shutdown requested");
                stop.stop();
            }
            Err(e) => tracing::warn!("Unable to listen for shutdown signal: {}", e),
        }
    });

    dashboard.run().await?;
    Ok(())
}
