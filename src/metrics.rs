//! Metrics for version negotiation.
//!
//! Provides Prometheus metrics for monitoring which representation versions
//! clients negotiate, and how often they still land on deprecated ones.

use crate::registry::ResourceRegistry;
use crate::version::LifecycleState;
use prometheus::{IntCounterVec, IntGaugeVec, Opts, Registry};

/// Metrics collector for version negotiation.
#[derive(Clone)]
pub struct NegotiationMetrics {
    /// Registry for all metrics
    registry: Registry,

    /// Counter for negotiations by selected version and outcome
    pub negotiations_total: IntCounterVec,

    /// Counter for responses served from deprecated versions
    pub deprecated_total: IntCounterVec,

    /// Counter for rejected negotiations
    pub rejected_total: IntCounterVec,

    /// Gauge for registered versions per lifecycle state
    pub registered_versions: IntGaugeVec,
}

impl NegotiationMetrics {
    /// Create a new metrics collector with the given prefix.
    pub fn new(prefix: &str) -> Self {
        let registry = Registry::new();

        let negotiations_total = IntCounterVec::new(
            Opts::new(
                format!("{}_negotiations_total", prefix),
                "Total number of version negotiations",
            ),
            &["resource", "version", "outcome"],
        )
        .expect("Failed to create negotiations_total metric");

        let deprecated_total = IntCounterVec::new(
            Opts::new(
                format!("{}_deprecated_total", prefix),
                "Total number of responses served from deprecated versions",
            ),
            &["resource", "version"],
        )
        .expect("Failed to create deprecated_total metric");

        let rejected_total = IntCounterVec::new(
            Opts::new(
                format!("{}_rejected_total", prefix),
                "Total number of rejected negotiations",
            ),
            &["resource", "reason"],
        )
        .expect("Failed to create rejected_total metric");

        let registered_versions = IntGaugeVec::new(
            Opts::new(
                format!("{}_registered_versions", prefix),
                "Registered versions per resource and lifecycle state",
            ),
            &["resource", "state"],
        )
        .expect("Failed to create registered_versions metric");

        // Register all metrics
        registry
            .register(Box::new(negotiations_total.clone()))
            .expect("Failed to register negotiations_total");
        registry
            .register(Box::new(deprecated_total.clone()))
            .expect("Failed to register deprecated_total");
        registry
            .register(Box::new(rejected_total.clone()))
            .expect("Failed to register rejected_total");
        registry
            .register(Box::new(registered_versions.clone()))
            .expect("Failed to register registered_versions");

        Self {
            registry,
            negotiations_total,
            deprecated_total,
            rejected_total,
            registered_versions,
        }
    }

    /// Record a successful negotiation.
    pub fn record_negotiated(&self, resource: &str, version: u32, deprecated: bool) {
        let version = version.to_string();
        let outcome = if deprecated { "deprecated" } else { "active" };
        self.negotiations_total
            .with_label_values(&[resource, version.as_str(), outcome])
            .inc();
        if deprecated {
            self.deprecated_total
                .with_label_values(&[resource, version.as_str()])
                .inc();
        }
    }

    /// Record a rejected negotiation.
    pub fn record_rejected(&self, resource: &str, reason: &str) {
        self.negotiations_total
            .with_label_values(&[resource, "none", "rejected"])
            .inc();
        self.rejected_total
            .with_label_values(&[resource, reason])
            .inc();
    }

    /// Publish registered version counts from the resource registry.
    pub fn observe_registry(&self, resources: &ResourceRegistry) {
        for resource in resources.resources() {
            for state in [
                LifecycleState::Active,
                LifecycleState::Deprecated,
                LifecycleState::Removed,
            ] {
                let count = resources.count_in_state(resource, state);
                self.registered_versions
                    .with_label_values(&[resource, state.as_str()])
                    .set(count as i64);
            }
        }
    }

    /// Encode metrics in Prometheus text format.
    pub fn encode(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            tracing::warn!(error = %e, "Failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl Default for NegotiationMetrics {
    fn default() -> Self {
        Self::new("zentinel_api_versioning")
    }
}
