//! Prometheus metrics registry wrapper and server.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{self, CounterVec, Encoder, IntGauge, Opts, Registry, TextEncoder};
use std::{fmt::Debug, sync::Arc};

/// Custom prometheus metrics
#[derive(Debug, Clone)]
pub struct Metrics {
    upkeeps_performed: CounterVec,
    registry_events: CounterVec,
    last_seen_block: IntGauge,
}

/// Metrics Server
#[derive(Debug, Default, Clone)]
pub struct MetricServer {
    registry: Arc<Registry>,
}

impl Metrics {
    /// Create a new metrics object
    pub fn new(registry: &Registry) -> Self {
        let upkeeps_performed_opts =
            Opts::new("upkeeps_performed_total", "Total UpkeepPerformed events seen");
        let registry_events_opts =
            Opts::new("registry_events_total", "Total registry events seen, by kind");

        let upkeeps_performed = CounterVec::new(upkeeps_performed_opts, &["success"]).unwrap();
        let registry_events = CounterVec::new(registry_events_opts, &["event"]).unwrap();
        let last_seen_block =
            IntGauge::new("last_seen_block", "Most recent block an event was seen in").unwrap();

        registry.register(Box::new(upkeeps_performed.clone())).unwrap();
        registry.register(Box::new(registry_events.clone())).unwrap();
        registry.register(Box::new(last_seen_block.clone())).unwrap();

        Self { upkeeps_performed, registry_events, last_seen_block }
    }

    /// Increment the performed-upkeeps counter.
    pub fn incr_upkeep_performed(&self, success: bool) {
        let label = if success { "true" } else { "false" };
        self.upkeeps_performed.with_label_values(&[label]).inc();
    }

    /// Increment the per-kind event counter.
    pub fn incr_event(&self, kind: &str) {
        self.registry_events.with_label_values(&[kind]).inc();
    }

    /// Record the most recent block an event was seen in.
    pub fn set_last_seen_block(&self, block: u64) {
        self.last_seen_block.set(block as i64);
    }
}

impl MetricServer {
    /// Return a new server instance
    pub const fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Serve metrics
    pub async fn serve(&self, addr: &str) -> Result<(), std::io::Error> {
        let registry = Arc::clone(&self.registry);

        let router =
            Router::new().route("/metrics", get(Self::handle_metrics)).with_state(registry);

        let addr: std::net::SocketAddr = addr.parse().unwrap();
        let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
        axum::serve(listener, router).await
    }

    /// Metrics path
    async fn handle_metrics(State(registry): State<Arc<Registry>>) -> impl IntoResponse {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        let metric_families = registry.gather();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        let metrics = String::from_utf8(buffer).unwrap();
        (StatusCode::OK, metrics).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_the_registry() {
        let registry = Registry::new();
        let metrics = Metrics::new(&registry);

        metrics.incr_upkeep_performed(true);
        metrics.incr_upkeep_performed(true);
        metrics.incr_upkeep_performed(false);
        metrics.incr_event("upkeep_registered");
        metrics.set_last_seen_block(1234);

        let families = registry.gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"upkeeps_performed_total".to_string()));
        assert!(names.contains(&"registry_events_total".to_string()));
        assert!(names.contains(&"last_seen_block".to_string()));

        let performed =
            families.iter().find(|f| f.get_name() == "upkeeps_performed_total").unwrap();
        let total: f64 = performed.get_metric().iter().map(|m| m.get_counter().get_value()).sum();
        assert_eq!(total, 3.0);
    }
}
