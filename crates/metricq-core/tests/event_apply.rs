//! Event application against collectors of every kind.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use metricq_core::{label_set, Collector, LabelSet, MetricEvent, MetricKind, MetricSpec};

fn succeed() -> LabelSet {
    label_set(&[("succeed", "True")])
}

fn collector(kind: MetricKind, name: &str) -> Collector {
    Collector::new(MetricSpec::new(kind, name, "none").labels(&["succeed"])).unwrap()
}

#[test]
fn counter_sums_increments() {
    let c = collector(MetricKind::Counter, "total");
    MetricEvent::counter_inc("total", 1.0, succeed()).apply(&c).unwrap();
    MetricEvent::counter_inc("total", 24.0, succeed()).apply(&c).unwrap();
    assert_eq!(c.value(&["True"]), Some(25.0));
}

#[test]
fn counter_rejects_negative_and_nan() {
    let c = collector(MetricKind::Counter, "total");
    MetricEvent::counter_inc("total", 3.0, succeed()).apply(&c).unwrap();

    for bad in [-1.0, f64::NAN] {
        let err = MetricEvent::counter_inc("total", bad, succeed())
            .apply(&c)
            .expect_err("must reject");
        assert_eq!(err.code().as_str(), "INVALID_AMOUNT");
    }
    assert_eq!(c.value(&["True"]), Some(3.0));
}

#[test]
fn gauge_ops_compose_in_order() {
    let g = collector(MetricKind::Gauge, "sec");
    MetricEvent::gauge_dec("sec", 2.0, succeed()).apply(&g).unwrap();
    assert_eq!(g.value(&["True"]), Some(-2.0));

    MetricEvent::gauge_inc("sec", 5.0, succeed()).apply(&g).unwrap();
    MetricEvent::gauge_set("sec", 10.0, succeed()).apply(&g).unwrap();
    MetricEvent::gauge_dec("sec", 0.5, succeed()).apply(&g).unwrap();
    assert_eq!(g.value(&["True"]), Some(9.5));
}

#[test]
fn summary_and_histogram_observe() {
    let s = collector(MetricKind::Summary, "req_size");
    MetricEvent::summary_observe("req_size", 4.0, succeed()).apply(&s).unwrap();
    MetricEvent::summary_observe("req_size", 6.0, succeed()).apply(&s).unwrap();
    assert_eq!(s.sample_count(&["True"]), Some(2));
    assert_eq!(s.sample_sum(&["True"]), Some(10.0));

    let h = collector(MetricKind::Histogram, "latency");
    MetricEvent::histogram_observe("latency", 0.3, succeed()).apply(&h).unwrap();
    assert_eq!(h.sample_count(&["True"]), Some(1));
    let fam = h.collect();
    let le_025 = fam
        .sample("latency_bucket", &[("succeed", "True"), ("le", "0.25")])
        .unwrap();
    let le_05 = fam
        .sample("latency_bucket", &[("succeed", "True"), ("le", "0.5")])
        .unwrap();
    assert_eq!(le_025.value, 0.0);
    assert_eq!(le_05.value, 1.0);
}

#[test]
fn info_sets_fields() {
    let i = collector(MetricKind::Info, "build");
    let fields = label_set(&[("version", "1.2.3"), ("commit", "abc")]);
    MetricEvent::info_set("build", fields.clone(), succeed()).apply(&i).unwrap();
    assert_eq!(i.info(&["True"]), Some(fields));

    let clash = label_set(&[("succeed", "x")]);
    let err = MetricEvent::info_set("build", clash, succeed())
        .apply(&i)
        .expect_err("info keys may not shadow labels");
    assert_eq!(err.code().as_str(), "INVALID_AMOUNT");
}

#[test]
fn enum_switches_between_declared_states() {
    let e = Collector::new(
        MetricSpec::new(MetricKind::Enum, "phase", "none")
            .labels(&["succeed"])
            .states(&["idle", "busy"]),
    )
    .unwrap();
    MetricEvent::enum_state("phase", "busy", succeed()).apply(&e).unwrap();
    assert_eq!(e.state(&["True"]).as_deref(), Some("busy"));

    let err = MetricEvent::enum_state("phase", "asleep", succeed())
        .apply(&e)
        .expect_err("undeclared state");
    assert_eq!(err.code().as_str(), "UNKNOWN_STATE");
    assert_eq!(e.state(&["True"]).as_deref(), Some("busy"));
}

#[test]
fn kind_mismatch_is_rejected_without_mutation() {
    let c = Collector::new(MetricSpec::new(MetricKind::Counter, "x", "none")).unwrap();
    let ev = MetricEvent::enum_state("x", "busy", LabelSet::new());

    assert!(!ev.kind_matches(&c));
    let err = ev.apply(&c).expect_err("kind mismatch");
    assert_eq!(err.code().as_str(), "KIND_MISMATCH");
    assert_eq!(c.value(&[]), Some(0.0));

    // All three gauge operations share the gauge kind.
    let g = Collector::new(MetricSpec::new(MetricKind::Gauge, "g", "none")).unwrap();
    for ev in [
        MetricEvent::gauge_inc("g", 1.0, LabelSet::new()),
        MetricEvent::gauge_dec("g", 1.0, LabelSet::new()),
        MetricEvent::gauge_set("g", 1.0, LabelSet::new()),
    ] {
        assert!(ev.kind_matches(&g));
        assert!(!ev.kind_matches(&c));
    }
}

#[test]
fn label_mismatch_fails_at_apply() {
    let c = collector(MetricKind::Counter, "total");
    let ev = MetricEvent::counter_inc("total", 1.0, label_set(&[("succeed", "True"), ("extra", "1")]));
    let err = ev.apply(&c).expect_err("superset");
    assert_eq!(err.code().as_str(), "LABEL_MISMATCH");

    let err = MetricEvent::counter_inc("total", 1.0, LabelSet::new())
        .apply(&c)
        .expect_err("subset");
    assert_eq!(err.code().as_str(), "LABEL_MISMATCH");
    assert_eq!(c.series_count(), 0);
}
