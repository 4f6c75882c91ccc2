//! CODET monitor: periodic connectivity and density analysis.
//!
//! The monitor wakes once per period, takes a frozen snapshot of the
//! topology and runs both analytics over it with no lock held. The result
//! is published as a single [`DashboardEvent::AnalyticsReady`] and kept as
//! the latest report.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use denis_analysis::{classify, detect, mark_disconnected, DensityThresholds};
use denis_topology::TopologyStore;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::events::{AnalyticsReport, DashboardEvent, EventBus};
use crate::shutdown::StopSignal;

/// Scheduler state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    Idle,
    Running,
}

struct RunHandle {
    stop: StopSignal,
    task: JoinHandle<()>,
}

/// Periodic analytics scheduler.
pub struct Monitor {
    store: Arc<TopologyStore>,
    events: EventBus,
    border: String,
    period: watch::Sender<Duration>,
    latest: RwLock<Option<Arc<AnalyticsReport>>>,
    ticks: AtomicU64,
    run: Mutex<Option<RunHandle>>,
}

impl Monitor {
    /// Create an idle monitor checking connectivity against `border`.
    pub fn new(store: Arc<TopologyStore>, events: EventBus, border: impl Into<String>, period: Duration) -> Result<Self> {
        check_period(period)?;
        let (period, _) = watch::channel(period);
        Ok(Self {
            store,
            events,
            border: border.into(),
            period,
            latest: RwLock::new(None),
            ticks: AtomicU64::new(0),
            run: Mutex::new(None),
        })
    }

    pub fn border(&self) -> &str {
        &self.border
    }

    pub fn period(&self) -> Duration {
        *self.period.borrow()
    }

    /// Change the period. A wait in progress restarts with the new period.
    pub fn set_period(&self, period: Duration) -> Result<()> {
        check_period(period)?;
        self.period.send_replace(period);
        info!("Monitor period set to {:?}", period);
        Ok(())
    }

    pub fn state(&self) -> MonitorState {
        match &*self.run.lock().unwrap_or_else(PoisonError::into_inner) {
            Some(handle) if !handle.task.is_finished() => MonitorState::Running,
            _ => MonitorState::Idle,
        }
    }

    /// Most recent analytics report, if any tick has run.
    pub fn latest(&self) -> Option<Arc<AnalyticsReport>> {
        self.latest.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Start the periodic loop. Returns `false` if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(&*run, Some(handle) if !handle.task.is_finished()) {
            return false;
        }

        let stop = StopSignal::new();
        let monitor = Arc::clone(self);
        let task = tokio::spawn(monitor.run_loop(stop.clone()));
        *run = Some(RunHandle { stop, task });

        info!(border = %self.border, "Starting CODET every {:?}", self.period());
        true
    }

    /// Signal the loop to stop. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match self.run.lock().unwrap_or_else(PoisonError::into_inner).take() {
            Some(handle) => {
                handle.stop.stop();
                !handle.task.is_finished()
            }
            None => false,
        }
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(&self) {
        let handle = self.run.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            handle.stop.stop();
            if let Err(e) = handle.task.await {
                warn!("Monitor task ended abnormally: {}", e);
            }
        }
    }

    async fn run_loop(self: Arc<Self>, stop: StopSignal) {
        let mut period_rx = self.period.subscribe();
        loop {
            let period = *period_rx.borrow_and_update();
            info!("CODET waiting for {:?}", period);
            tokio::select! {
                _ = stop.stopped() => break,
                _ = period_rx.changed() => continue,
                _ = tokio::time::sleep(period) => {
                    if let Err(e) = self.tick().await {
                        warn!("CODET run failed: {}", e);
                    }
                }
            }
        }
        info!("Stopping CODET");
    }

    /// Run one analysis on the blocking pool, off the async workers.
    pub async fn tick(self: &Arc<Self>) -> Result<Arc<AnalyticsReport>> {
        let monitor = Arc::clone(self);
        tokio::task::spawn_blocking(move || monitor.run_tick())
            .await
            .map_err(|e| Error::Task(e.to_string()))
    }

    /// Run one analysis over the current topology and publish it.
    pub fn run_tick(&self) -> Arc<AnalyticsReport> {
        let topology = self.store.snapshot();
        let tick = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;

        let disconnected = detect(&topology, &self.border);
        let mut ranking = classify(&topology);
        let degrees: Vec<usize> = ranking.iter().map(|e| e.degree).collect();
        mark_disconnected(&mut ranking, &disconnected);

        let border_present = topology.contains(&self.border);
        if !border_present && !topology.is_empty() {
            warn!(border = %self.border, "Border node missing from topology; every node reported disconnected");
        }
        if !disconnected.is_empty() {
            warn!("Node(s) {:?} are disconnected", disconnected);
        }

        let report = Arc::new(AnalyticsReport {
            version: topology.version(),
            tick,
            border: self.border.clone(),
            border_present,
            disconnected,
            ranking,
            thresholds: DensityThresholds::from_sorted(&degrees),
        });
        info!(
            tick,
            version = report.version,
            nodes = topology.len(),
            disconnected = report.disconnected.len(),
            "CODET run complete"
        );

        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&report));
        self.events
            .publish(DashboardEvent::AnalyticsReady((*report).clone()));
        report
    }
}

fn check_period(period: Duration) -> Result<()> {
    if period.is_zero() {
        return Err(Error::Configuration("monitor period must be positive".into()));
    }
    Ok(())
}
