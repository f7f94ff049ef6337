use lazy_static::lazy_static;
use prometheus::{core::Collector, IntCounter, IntGauge, Registry};
use tracing::error;

lazy_static! {
    static ref REGISTRY_SESSIONS_TOTAL: IntGauge =
        IntGauge::new("webrig_registry_sessions_total", "Total live sessions").unwrap();
    static ref REGISTRY_SCENARIOS_TOTAL: IntGauge =
        IntGauge::new("webrig_registry_scenarios_total", "Total live scenarios").unwrap();
    static ref REGISTRY_SESSIONS_CLOSED: IntCounter = IntCounter::new(
        "webrig_registry_sessions_closed_total",
        "Sessions closed since process start",
    )
    .unwrap();
    static ref REGISTRY_DRIVER_CLOSE_FAILURES: IntCounter = IntCounter::new(
        "webrig_registry_driver_close_failures_total",
        "Driver handle closes that reported an error",
    )
    .unwrap();
}

fn register<C>(registry: &Registry, collector: C)
where
    C: Collector + Clone + Send + Sync + 'static,
{
    if let Err(err) = registry.register(Box::new(collector.clone())) {
        if !matches!(err, prometheus::Error::AlreadyReg) {
            error!(?err, "failed to register registry metric");
        }
    }
}

/// Install the collectors into an embedder-provided exposition registry.
///
/// Gauge and counter updates happen whether or not this was called; an
/// embedder that serves a metrics endpoint calls it once at startup. Safe
/// to call more than once.
pub fn register_metrics(registry: &Registry) {
    register(registry, REGISTRY_SESSIONS_TOTAL.clone());
    register(registry, REGISTRY_SCENARIOS_TOTAL.clone());
    register(registry, REGISTRY_SESSIONS_CLOSED.clone());
    register(registry, REGISTRY_DRIVER_CLOSE_FAILURES.clone());
}

pub fn set_session_count(count: usize) {
    REGISTRY_SESSIONS_TOTAL.set(count as i64);
}

pub fn set_scenario_count(count: usize) {
    REGISTRY_SCENARIOS_TOTAL.set(count as i64);
}

pub fn record_session_closed() {
    REGISTRY_SESSIONS_CLOSED.inc();
}

pub fn record_driver_close_failure() {
    REGISTRY_DRIVER_CLOSE_FAILURES.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_exposes_all_collectors_and_tolerates_repeats() {
        let registry = Registry::new();
        register_metrics(&registry);
        // the second call hits AlreadyReg on every collector
        register_metrics(&registry);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"webrig_registry_sessions_total".to_string()));
        assert!(names.contains(&"webrig_registry_scenarios_total".to_string()));
        assert!(names.contains(&"webrig_registry_sessions_closed_total".to_string()));
        assert!(names.contains(&"webrig_registry_driver_close_failures_total".to_string()));
    }
}
