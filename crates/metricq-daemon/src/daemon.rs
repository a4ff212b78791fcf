//! Daemon: owns the registry, the event queue, the worker thread and the
//! exposition server.
//!
//! Lifecycle: `Stopped -> Running -> Draining -> Stopped`.
//! - `run` binds the endpoint first (a bind failure returns before any thread
//!   is started), then spawns the worker. The queue receiver only leaves the
//!   daemon once both exist, so a failed `run` keeps queued events.
//! - `shutdown` raises the stop flag, joins the worker, and only then stops
//!   the endpoint, so no registry mutation races the endpoint teardown.
//!   Calling it while not running is a no-op.
//!
//! The worker hands the queue receiver back when it exits, so a stopped daemon
//! can be run again; events enqueued while stopped wait in the queue.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use metricq_core::error::{MetricError, Result};
use metricq_core::{Collector, MetricKind, MetricSpec};

use crate::app_state::AppState;
use crate::client::MetricClient;
use crate::config::schema::refresh_period;
use crate::config::{DaemonConfig, DaemonSection};
use crate::queue::{self, EventReceiver, EventSender};
use crate::registry::MetricRegistry;
use crate::server::ExpositionServer;
use crate::worker::{StatsSnapshot, Worker, WorkerOptions, WorkerStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonState {
    Stopped,
    Running,
    Draining,
}

struct Running {
    server: ExpositionServer,
    worker: JoinHandle<Option<EventReceiver>>,
    stop: Arc<AtomicBool>,
}

struct Lifecycle {
    state: DaemonState,
    running: Option<Running>,
}

pub struct MetricDaemon {
    settings: DaemonSection,
    registry: Arc<MetricRegistry>,
    tx: EventSender,
    rx: Mutex<Option<EventReceiver>>,
    stats: Arc<WorkerStats>,
    draining: Arc<AtomicBool>,
    lifecycle: Mutex<Lifecycle>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for MetricDaemon {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricDaemon {
    /// Daemon with default settings and an empty registry.
    pub fn new() -> Self {
        Self::build(DaemonSection::default())
    }

    pub fn with_settings(settings: DaemonSection) -> Result<Self> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    /// Build from config and create every declared metric.
    pub fn from_config(cfg: &DaemonConfig) -> Result<Self> {
        cfg.validate()?;
        let daemon = Self::build(cfg.daemon.clone());
        for m in &cfg.metrics {
            daemon.create(m.to_spec())?;
        }
        Ok(daemon)
    }

    fn build(settings: DaemonSection) -> Self {
        let (tx, rx) = queue::channel();
        tracing::info!("metric daemon initialized");
        Self {
            settings,
            registry: Arc::new(MetricRegistry::new()),
            tx,
            rx: Mutex::new(Some(rx)),
            stats: Arc::new(WorkerStats::default()),
            draining: Arc::new(AtomicBool::new(false)),
            lifecycle: Mutex::new(Lifecycle {
                state: DaemonState::Stopped,
                running: None,
            }),
        }
    }

    pub fn settings(&self) -> &DaemonSection {
        &self.settings
    }

    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.registry)
    }

    /// A producer handle feeding this daemon's queue.
    pub fn client(&self) -> MetricClient {
        MetricClient::new(self.tx.clone())
    }

    // --------------------
    // Construction API
    // --------------------

    /// Create a metric unless the name is already taken (then a no-op).
    pub fn create(&self, spec: MetricSpec) -> Result<()> {
        self.registry.create(spec)
    }

    pub fn create_counter(&self, name: &str, documentation: &str, label_names: &[&str]) -> Result<()> {
        self.create(MetricSpec::new(MetricKind::Counter, name, documentation).labels(label_names))
    }

    pub fn create_gauge(&self, name: &str, documentation: &str, label_names: &[&str]) -> Result<()> {
        self.create(MetricSpec::new(MetricKind::Gauge, name, documentation).labels(label_names))
    }

    pub fn create_summary(&self, name: &str, documentation: &str, label_names: &[&str]) -> Result<()> {
        self.create(MetricSpec::new(MetricKind::Summary, name, documentation).labels(label_names))
    }

    /// Histogram with the default buckets.
    pub fn create_histogram(&self, name: &str, documentation: &str, label_names: &[&str]) -> Result<()> {
        self.create(MetricSpec::new(MetricKind::Histogram, name, documentation).labels(label_names))
    }

    pub fn create_histogram_with_buckets(
        &self,
        name: &str,
        documentation: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<()> {
        self.create(
            MetricSpec::new(MetricKind::Histogram, name, documentation)
                .labels(label_names)
                .buckets(buckets),
        )
    }

    pub fn create_info(&self, name: &str, documentation: &str, label_names: &[&str]) -> Result<()> {
        self.create(MetricSpec::new(MetricKind::Info, name, documentation).labels(label_names))
    }

    pub fn create_enum(
        &self,
        name: &str,
        documentation: &str,
        label_names: &[&str],
        states: &[&str],
    ) -> Result<()> {
        self.create(
            MetricSpec::new(MetricKind::Enum, name, documentation)
                .labels(label_names)
                .states(states),
        )
    }

    /// Remove a metric. Fails with `MetricNotFound` if absent.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.registry.remove(name).map(|_| ())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Collector>> {
        self.registry.get(name)
    }

    // --------------------
    // Lifecycle
    // --------------------

    pub fn state(&self) -> DaemonState {
        lock(&self.lifecycle).state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Events queued and not yet picked up by the worker.
    pub fn pending(&self) -> usize {
        self.tx.pending()
    }

    /// Bound address of the exposition endpoint while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        lock(&self.lifecycle)
            .running
            .as_ref()
            .map(|r| r.server.local_addr())
    }

    /// Run with the host, port and refresh rate from the settings.
    pub fn run_configured(&self) -> Result<()> {
        let s = &self.settings;
        self.run(&s.host, s.port, s.refresh_rate_secs)
    }

    /// Start the exposition endpoint on `host:port` and the worker loop with a
    /// cycle period of `refresh_rate` seconds.
    pub fn run(&self, host: &str, port: u16, refresh_rate: f64) -> Result<()> {
        let refresh = refresh_period(refresh_rate)?;

        let mut lc = lock(&self.lifecycle);
        if lc.state != DaemonState::Stopped {
            return Err(MetricError::AlreadyRunning);
        }

        self.draining.store(false, Ordering::Relaxed);
        let state = AppState::new(Arc::clone(&self.registry), Arc::clone(&self.draining));
        let server = ExpositionServer::start(host, port, &self.settings.metrics_path, state)?;

        // The worker thread exists before the receiver leaves `self.rx`, so a
        // failed spawn cannot lose the queue.
        let stop = Arc::new(AtomicBool::new(false));
        let (worker_tx, worker_rx) = oneshot::channel::<Worker>();
        let handle = thread::Builder::new()
            .name("metricq-worker".into())
            .spawn(move || worker_rx.blocking_recv().ok().map(Worker::run))
            .map_err(|e| MetricError::Internal(format!("failed to spawn worker thread: {e}")))?;

        let Some(rx) = lock(&self.rx).take() else {
            drop(worker_tx);
            let _ = handle.join();
            return Err(MetricError::Internal("event receiver unavailable".into()));
        };
        let worker = Worker::new(
            Arc::clone(&self.registry),
            rx,
            Arc::clone(&stop),
            Arc::clone(&self.stats),
            WorkerOptions {
                refresh,
                max_events_per_cycle: self.settings.max_events_per_cycle,
                drain_on_shutdown: self.settings.drain_on_shutdown,
            },
        );
        if let Err(worker) = worker_tx.send(worker) {
            *lock(&self.rx) = Some(worker.into_receiver());
            let _ = handle.join();
            return Err(MetricError::Internal("worker thread exited before start".into()));
        }

        lc.state = DaemonState::Running;
        lc.running = Some(Running {
            server,
            worker: handle,
            stop,
        });
        tracing::info!(%host, port, refresh_rate, "metric daemon running");
        Ok(())
    }

    /// Stop the worker, then the endpoint. Blocks until both threads exit.
    pub fn shutdown(&self) {
        let running = {
            let mut lc = lock(&self.lifecycle);
            if lc.state != DaemonState::Running {
                return;
            }
            lc.state = DaemonState::Draining;
            lc.running.take()
        };
        let Some(running) = running else {
            lock(&self.lifecycle).state = DaemonState::Stopped;
            return;
        };

        self.draining.store(true, Ordering::Relaxed);
        running.stop.store(true, Ordering::Release);
        running.worker.thread().unpark();
        match running.worker.join() {
            Ok(Some(rx)) => *lock(&self.rx) = Some(rx),
            Ok(None) | Err(_) => tracing::error!("worker thread panicked; event queue lost"),
        }

        running.server.stop();

        lock(&self.lifecycle).state = DaemonState::Stopped;
        tracing::info!(stats = ?self.stats(), "metric daemon stopped");
    }
}

impl Drop for MetricDaemon {
    fn drop(&mut self) {
        self.shutdown();
    }
}
