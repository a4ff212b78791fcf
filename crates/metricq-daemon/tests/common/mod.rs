//! Shared helpers for daemon integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use metricq_daemon::config::DaemonSection;
use metricq_daemon::MetricDaemon;

/// Worker cycle period used by tests (seconds).
pub const FAST: f64 = 0.001;

/// A daemon with the default settings except for the drain flag.
pub fn daemon(drain_on_shutdown: bool) -> MetricDaemon {
    MetricDaemon::with_settings(DaemonSection {
        drain_on_shutdown,
        ..DaemonSection::default()
    })
    .unwrap()
}

/// Run on an ephemeral local port.
pub fn run_local(d: &MetricDaemon) -> SocketAddr {
    d.run("127.0.0.1", 0, FAST).expect("run");
    d.local_addr().expect("bound address")
}

/// Block until the worker has processed `n` events in total.
pub fn wait_processed(d: &MetricDaemon, n: u64) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while d.stats().processed() < n {
        assert!(Instant::now() < deadline, "worker stalled: {:?}", d.stats());
        std::thread::sleep(Duration::from_millis(1));
    }
}

/// Plain HTTP/1.1 GET; returns (status line, body).
pub fn http_get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    write!(
        stream,
        "GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).unwrap();
    let (head, body) = raw.split_once("\r\n\r\n").expect("http response");
    let status = head.lines().next().unwrap_or_default().to_string();
    (status, body.to_string())
}
