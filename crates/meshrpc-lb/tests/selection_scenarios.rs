//! End-to-end selection scenarios against a static registry.

use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use meshrpc_core::{
    CallConfig, ExclusionSet, MethodSignature, ParamType, ServiceCall, ServiceInstance,
    StaticRegistry,
};
use meshrpc_lb::weight::{PROP_WARMUP, PROP_WEIGHT};
use meshrpc_lb::{BalancerConfig, StrategyKind};

// ─── Helpers ──────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    (out, logs.contents())
}

fn foo_call() -> ServiceCall {
    ServiceCall::new(
        "X",
        MethodSignature::new("foo", Vec::<ParamType>::new()),
        vec![],
        Arc::new(CallConfig::default()),
    )
}

// ─── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn scenario_a_single_weighted_instance() {
    let registry = Arc::new(StaticRegistry::new());
    registry.register(Arc::new(
        ServiceInstance::new("X", "1", "10.0.0.1", 8080).with_prop(PROP_WEIGHT, 10),
    ));

    for kind in [StrategyKind::RoundRobin, StrategyKind::Random, StrategyKind::ConsistentHash] {
        let lb = BalancerConfig::with_strategy(kind).build(registry.clone());
        let picked = lb.choose_instance(&foo_call(), &ExclusionSet::new()).unwrap();
        assert_eq!(picked.id(), "1", "strategy {kind}");
    }
}

#[test]
fn scenario_b_unready_instance_is_skipped_and_logged() {
    let registry = Arc::new(
        StaticRegistry::from_json(
            r#"{"X": [
                {"id": "1", "host": "10.0.0.1", "port": 8080, "ready": false},
                {"id": "2", "host": "10.0.0.2", "port": 8080}
            ]}"#,
        )
        .unwrap(),
    );
    let lb = BalancerConfig::default().build(registry);

    let (picked, logs) =
        with_captured_logs(|| lb.choose_instance(&foo_call(), &ExclusionSet::new()));
    assert_eq!(picked.unwrap().id(), "2");
    assert!(logs.contains("not ready"), "logs: {logs}");
}

#[test]
fn retry_sequence_walks_every_instance_then_reuses() {
    let registry = Arc::new(StaticRegistry::new());
    for id in ["a", "b", "c"] {
        registry.register(Arc::new(ServiceInstance::new("X", id, "h", 1)));
    }
    let lb = BalancerConfig::with_strategy(StrategyKind::Random).build(registry);
    let call = foo_call();

    let mut exclusion = ExclusionSet::new();
    for _ in 0..3 {
        let picked = lb.choose_instance(&call, &exclusion).unwrap();
        assert!(exclusion.insert(picked.id()), "picked {} twice", picked.id());
    }
    // Everything tried: still a best-effort pick.
    assert!(lb.choose_instance(&call, &exclusion).is_some());
}

#[test]
fn readiness_flip_is_observed_by_next_selection() {
    let registry = Arc::new(StaticRegistry::new());
    registry.register(Arc::new(ServiceInstance::new("X", "1", "h", 1)));
    let lb = BalancerConfig::default().build(registry.clone());

    registry.set_ready("X", "1", false);
    assert!(lb.choose_instance(&foo_call(), &ExclusionSet::new()).is_none());
    registry.set_ready("X", "1", true);
    assert!(lb.choose_instance(&foo_call(), &ExclusionSet::new()).is_some());
}

#[test]
fn warming_instance_receives_less_traffic() {
    let now = SystemTime::now();
    let registry = Arc::new(StaticRegistry::new());
    registry.register(Arc::new(
        ServiceInstance::new("X", "old", "h", 1).with_prop(PROP_WEIGHT, 100),
    ));
    // One minute into a ten minute warmup: effective weight 10.
    registry.register(Arc::new(
        ServiceInstance::new("X", "new", "h", 2)
            .with_prop(PROP_WEIGHT, 100)
            .with_prop(PROP_WARMUP, 600_000)
            .with_start_time(now - Duration::from_secs(60)),
    ));
    let lb = BalancerConfig::with_strategy(StrategyKind::Random).build(registry);

    let fresh = (0..2_000)
        .filter(|_| {
            lb.choose_instance(&foo_call(), &ExclusionSet::new())
                .unwrap()
                .id()
                == "new"
        })
        .count();
    assert!(fresh < 500, "warming instance got {fresh} of 2000 picks");
}
