#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use metricq_core::MetricKind;
use metricq_daemon::config::{self, DaemonSection};
use metricq_daemon::MetricDaemon;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
daemon:
  port: 9100
  refresh_rate: 0.5 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.code().as_str(), "BAD_CONFIG");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.daemon.host, "0.0.0.0");
    assert_eq!(cfg.daemon.port, 8081);
    assert_eq!(cfg.daemon.refresh_rate_secs, 0.5);
    assert_eq!(cfg.daemon.metrics_path, "/metrics");
    assert_eq!(cfg.daemon.max_events_per_cycle, 1);
    assert!(cfg.daemon.drain_on_shutdown);
    assert!(cfg.metrics.is_empty());
}

#[test]
fn unsupported_version() {
    let err = config::load_from_str("version: 2\n").expect_err("must fail");
    assert_eq!(err.code().as_str(), "UNSUPPORTED_VERSION");
}

#[test]
fn out_of_range_values() {
    for bad in [
        "version: 1\ndaemon: { refresh_rate_secs: 0 }\n",
        "version: 1\ndaemon: { refresh_rate_secs: -1.0 }\n",
        "version: 1\ndaemon: { refresh_rate_secs: 120 }\n",
        "version: 1\ndaemon: { metrics_path: metrics }\n",
        "version: 1\ndaemon: { metrics_path: /healthz }\n",
        "version: 1\ndaemon: { max_events_per_cycle: 0 }\n",
        "version: 1\ndaemon: { metrics_path: \"/:\" }\n",
        "version: 1\ndaemon: { metrics_path: \"/:id\" }\n",
        "version: 1\ndaemon: { metrics_path: \"/*rest\" }\n",
        "version: 1\ndaemon: { metrics_path: \"/{id}\" }\n",
        "version: 1\ndaemon: { metrics_path: \"/a//b\" }\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "config={bad}");
    }
}

#[test]
fn declared_metrics_are_created() {
    let ok = r#"
version: 1
daemon:
  refresh_rate_secs: 0.25
metrics:
  - { name: jobs_total, kind: counter, help: "Jobs", labels: [outcome] }
  - { name: phase, kind: enum, help: "Phase", states: [idle, busy] }
  - { name: latency, kind: histogram, buckets: [0.1, 1.0] }
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let daemon = MetricDaemon::from_config(&cfg).expect("daemon");

    let jobs = daemon.get("jobs_total").unwrap();
    assert_eq!(jobs.kind(), MetricKind::Counter);
    assert_eq!(jobs.label_names(), &["outcome".to_string()]);
    assert_eq!(daemon.get("phase").unwrap().state(&[]).as_deref(), Some("idle"));
    assert_eq!(daemon.get("latency").unwrap().buckets(), &[0.1, 1.0, f64::INFINITY]);
}

#[test]
fn misplaced_metric_options() {
    for bad in [
        "version: 1\nmetrics: [{ name: c, kind: counter, states: [a] }]\n",
        "version: 1\nmetrics: [{ name: g, kind: gauge, buckets: [1.0] }]\n",
        "version: 1\nmetrics: [{ name: c, kind: counter }, { name: c, kind: gauge }]\n",
        "version: 1\nmetrics: [{ name: c, kind: meter }]\n",
    ] {
        let err = config::load_from_str(bad).expect_err(bad);
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "config={bad}");
    }
}

#[test]
fn route_syntax_in_metrics_path_is_rejected_before_run() {
    for path in ["/:", "/prom/:x", "/*"] {
        let err = MetricDaemon::with_settings(DaemonSection {
            metrics_path: path.into(),
            ..DaemonSection::default()
        })
        .err()
        .expect(path);
        assert_eq!(err.code().as_str(), "BAD_CONFIG", "path={path}");
    }

    let ok = MetricDaemon::with_settings(DaemonSection {
        metrics_path: "/v1/prom-metrics_0.txt".into(),
        ..DaemonSection::default()
    });
    assert!(ok.is_ok());
}
