//! Boundary layer for versioned resources.
//!
//! Routes a request path to a resource, negotiates the representation
//! version from the `Accept` header, and turns the outcome into a status
//! code, headers, and a body.

use crate::config::VersioningConfig;
use crate::dispatcher::{Dispatcher, Resolution};
use crate::error::VersioningError;
use crate::headers::{not_acceptable_body, not_found_body, DeprecationHeaders};
use crate::metrics::NegotiationMetrics;
use crate::representations::{ProducerSet, RepresentationRequest};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An incoming request as seen by the gateway.
#[derive(Debug, Clone, Default)]
pub struct GatewayRequest {
    pub path: String,
    /// Raw `Accept` header value
    pub accept: Option<String>,
    /// Query or path parameters handed to the representation producer
    pub params: HashMap<String, String>,
}

impl GatewayRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

/// Response produced for a request.
#[derive(Debug, Clone, Serialize)]
pub struct GatewayResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    /// Resource the request was routed to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Version the negotiation selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    pub deprecated: bool,
}

impl GatewayResponse {
    fn json(status: u16, body: String) -> Self {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            status,
            headers,
            body,
            resource: None,
            version: None,
            deprecated: false,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// API versioning gateway
///
/// Owns the immutable registry and dispatcher built from configuration,
/// the representation producers, and the negotiation metrics.
pub struct VersionGateway {
    config: VersioningConfig,
    dispatcher: Dispatcher,
    producers: ProducerSet,
    metrics: NegotiationMetrics,
}

impl VersionGateway {
    /// Create a gateway with the built-in representation producers.
    pub fn new(config: VersioningConfig) -> anyhow::Result<Self> {
        Self::with_producers(config, ProducerSet::builtin())
    }

    /// Create a gateway with the given representation producers.
    pub fn with_producers(config: VersioningConfig, producers: ProducerSet) -> anyhow::Result<Self> {
        let registry = Arc::new(config.build_registry()?);
        let metrics = NegotiationMetrics::new(&config.metrics.prefix);
        if config.metrics.enabled {
            metrics.observe_registry(&registry);
        }

        for descriptor in registry.descriptors().filter(|d| d.is_matchable()) {
            if !producers.contains(&descriptor.representation) {
                warn!(
                    resource = %descriptor.resource,
                    version = descriptor.version,
                    representation = %descriptor.representation,
                    "No producer for representation"
                );
            }
            if descriptor.is_past_sunset() {
                warn!(
                    resource = %descriptor.resource,
                    version = descriptor.version,
                    sunset = ?descriptor.sunset_at,
                    "Deprecated version is past its sunset date"
                );
            }
        }

        info!(
            resources = registry.resources().len(),
            versions = registry.len(),
            "API versioning gateway initialized"
        );

        let dispatcher = Dispatcher::new(registry, config.media_format());
        Ok(Self {
            config,
            dispatcher,
            producers,
            metrics,
        })
    }

    /// Create from a YAML configuration string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        Self::new(VersioningConfig::from_yaml(yaml)?)
    }

    /// Get the metrics collector.
    pub fn metrics(&self) -> &NegotiationMetrics {
        &self.metrics
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Handle one request.
    pub fn handle(&self, request: &GatewayRequest) -> GatewayResponse {
        let Some(route) = self.config.find_resource(&request.path) else {
            debug!(path = %request.path, "No resource serves path");
            return GatewayResponse::json(404, not_found_body(&request.path));
        };
        let resource = route.name.as_str();
        let accept = request.accept.as_deref().unwrap_or("");

        let mut response = match self.dispatcher.resolve_accept(resource, accept) {
            Ok(resolution) => self.respond(request, resolution),
            Err(e) => self.reject(request, resource, e),
        };
        response.resource = Some(resource.to_string());
        response
            .headers
            .insert("Vary".to_string(), "Accept".to_string());
        response
    }

    fn respond(&self, request: &GatewayRequest, resolution: Resolution<'_>) -> GatewayResponse {
        let descriptor = resolution.descriptor;
        let deprecated = resolution.is_deprecated();

        if self.config.metrics.enabled {
            self.metrics
                .record_negotiated(&descriptor.resource, descriptor.version, deprecated);
        }

        if deprecated && self.config.settings.log_access {
            info!(
                resource = %descriptor.resource,
                version = descriptor.version,
                path = %request.path,
                successor = ?resolution.successor.map(|s| s.to_ref().to_string()),
                "Deprecated version accessed"
            );
        }

        let Some(producer) = self.producers.get(&descriptor.representation) else {
            error!(
                representation = %descriptor.representation,
                "No producer registered for negotiated representation"
            );
            return GatewayResponse::json(500, internal_error_body("missing_producer"));
        };

        let body = match producer
            .produce(&RepresentationRequest::new(&request.params))
            .and_then(|value| serde_json::to_string(&value))
        {
            Ok(body) => body,
            Err(e) => {
                error!(
                    representation = %descriptor.representation,
                    error = %e,
                    "Failed to produce representation"
                );
                return GatewayResponse::json(500, internal_error_body("serialization_failed"));
            }
        };

        let mut headers = if self.config.settings.include_headers {
            DeprecationHeaders::for_resolution(
                &resolution,
                self.dispatcher.format(),
                &self.config.settings,
            )
        } else {
            DeprecationHeaders::new()
        };
        headers = headers.with_header("Content-Type", resolution.media_type.clone());

        GatewayResponse {
            status: 200,
            headers: headers.build(),
            body,
            resource: None,
            version: Some(descriptor.version),
            deprecated,
        }
    }

    fn reject(&self, request: &GatewayRequest, resource: &str, e: VersioningError) -> GatewayResponse {
        if e.is_client_error() {
            debug!(
                path = %request.path,
                resource = %resource,
                error = %e,
                "Negotiation rejected"
            );
        } else {
            error!(resource = %resource, error = %e, "Negotiation failed");
        }

        let (reason, body) = match &e {
            VersioningError::Negotiation { .. } => (
                "not_acceptable",
                not_acceptable_body(&self.dispatcher, resource),
            ),
            VersioningError::NotFound { .. } => ("not_found", not_found_body(&request.path)),
            _ => ("internal", internal_error_body("registry")),
        };

        if self.config.metrics.enabled {
            self.metrics.record_rejected(resource, reason);
        }

        GatewayResponse::json(e.status_code(), body)
    }
}

fn internal_error_body(reason: &str) -> String {
    let response = serde_json::json!({
        "error": "internal_error",
        "reason": reason,
    });
    serde_json::to_string_pretty(&response).unwrap_or_default()
}
