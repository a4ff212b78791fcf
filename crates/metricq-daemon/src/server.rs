//! Exposition server lifecycle.
//!
//! The listening socket is bound synchronously in `start`, so a port already
//! in use fails the caller before any thread exists. Requests are then served
//! on a dedicated thread driving a current-thread tokio runtime. `stop` fires
//! the graceful-shutdown signal and joins that thread; the listener is closed
//! when `axum::serve` returns.

use std::net::SocketAddr;
use std::thread::{self, JoinHandle};

use tokio::sync::oneshot;

use metricq_core::error::{MetricError, Result};

use crate::app_state::AppState;
use crate::router;

pub struct ExpositionServer {
    local_addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ExpositionServer {
    pub fn start(host: &str, port: u16, metrics_path: &str, state: AppState) -> Result<Self> {
        let addr = format!("{host}:{port}");
        let std_listener = std::net::TcpListener::bind(&addr).map_err(|source| MetricError::Bind {
            addr: addr.clone(),
            source,
        })?;
        std_listener
            .set_nonblocking(true)
            .map_err(|e| MetricError::Internal(format!("set_nonblocking failed: {e}")))?;
        let local_addr = std_listener
            .local_addr()
            .map_err(|e| MetricError::Internal(format!("local_addr failed: {e}")))?;

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| MetricError::Internal(format!("failed to build tokio runtime: {e}")))?;
        let listener = {
            let _guard = rt.enter();
            tokio::net::TcpListener::from_std(std_listener)
                .map_err(|e| MetricError::Internal(format!("listener registration failed: {e}")))?
        };

        let app = router::build_router(state, metrics_path);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("metricq-http".into())
            .spawn(move || {
                rt.block_on(async move {
                    let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                        let _ = shutdown_rx.await;
                    });
                    if let Err(e) = serve.await {
                        tracing::error!(error = %e, "exposition server failed");
                    }
                });
            })
            .map_err(|e| MetricError::Internal(format!("failed to spawn http thread: {e}")))?;

        tracing::info!(%local_addr, "exposition server listening");
        Ok(Self {
            local_addr,
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Actual bound address (resolves port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop serving and close the listening socket. Blocks until the serving
    /// thread has exited.
    pub fn stop(mut self) {
        self.stop_inner();
    }

    fn stop_inner(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::error!("exposition server thread panicked");
            }
            tracing::info!(local_addr = %self.local_addr, "exposition server stopped");
        }
    }
}

impl Drop for ExpositionServer {
    fn drop(&mut self) {
        self.stop_inner();
    }
}
