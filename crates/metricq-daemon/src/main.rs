//! metricq daemon binary.
//!
//! Loads `metricq.yaml` (or the path given as the first argument), creates the
//! declared metrics, serves them until Ctrl-C / SIGTERM, then shuts down.

use tracing_subscriber::{fmt, EnvFilter};

use metricq_core::error::{MetricError, Result};
use metricq_daemon::{config, MetricDaemon};

fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    if let Err(e) = run() {
        tracing::error!(code = e.code().as_str(), error = %e, "metricq-daemon failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let path = std::env::args().nth(1).unwrap_or_else(|| "metricq.yaml".to_string());
    let cfg = config::load_from_file(&path)?;
    let daemon = MetricDaemon::from_config(&cfg)?;
    daemon.run_configured()?;

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| MetricError::Internal(format!("failed to build signal runtime: {e}")))?;
    rt.block_on(shutdown_signal());

    daemon.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, starting graceful shutdown");
}
