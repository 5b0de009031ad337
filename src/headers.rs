//! Header and body generation for negotiated responses.
//!
//! Implements standard headers for deprecated representation versions:
//! - Deprecation header (draft-ietf-httpapi-deprecation-header)
//! - Sunset header (RFC 8594)
//! - Link header with documentation and successor version

use crate::config::GlobalSettings;
use crate::dispatcher::{Dispatcher, Resolution};
use crate::media_type::MediaTypeFormat;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Builder for negotiation-related HTTP headers.
pub struct DeprecationHeaders {
    headers: HashMap<String, String>,
}

impl DeprecationHeaders {
    /// Create a new header builder.
    pub fn new() -> Self {
        Self {
            headers: HashMap::new(),
        }
    }

    /// Build headers for a deprecated resolution. Active resolutions get no
    /// headers.
    pub fn for_resolution(
        resolution: &Resolution<'_>,
        format: &MediaTypeFormat,
        settings: &GlobalSettings,
    ) -> Self {
        let mut builder = Self::new();
        if !resolution.is_deprecated() {
            return builder;
        }
        let descriptor = resolution.descriptor;

        // Format: Deprecation: true or Deprecation: @timestamp
        let deprecation = match &descriptor.deprecated_at {
            Some(deprecated_at) => format!("@{}", deprecated_at.timestamp()),
            None => "true".to_string(),
        };
        builder
            .headers
            .insert(settings.deprecation_header.clone(), deprecation);

        // Format: Sunset: <HTTP-date>
        if let Some(sunset_at) = &descriptor.sunset_at {
            builder
                .headers
                .insert(settings.sunset_header.clone(), format_http_date(sunset_at));
        }

        let successor_media_type = resolution
            .successor
            .map(|successor| format.for_descriptor(successor));

        let mut links = Vec::new();
        if let Some(docs_url) = &descriptor.documentation_url {
            links.push(format!("<{}>; rel=\"deprecation\"", docs_url));
        }
        if let Some(successor) = &successor_media_type {
            links.push(format!("<{}>; rel=\"successor-version\"", successor));
        }
        if !links.is_empty() {
            builder
                .headers
                .insert(settings.link_header.clone(), links.join(", "));
        }

        let message = descriptor
            .deprecation_message(&resolution.media_type, successor_media_type.as_deref());
        builder
            .headers
            .insert(settings.notice_header.clone(), message);

        builder
    }

    /// Add a custom header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Get all headers.
    pub fn build(self) -> HashMap<String, String> {
        self.headers
    }
}

impl Default for DeprecationHeaders {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a datetime as an HTTP date (RFC 7231).
/// Example: Sun, 06 Nov 1994 08:49:37 GMT
fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Generate a "406 Not Acceptable" response body.
///
/// Lists the media types the client may use instead, and the removed
/// versions together with what replaced them.
pub fn not_acceptable_body(dispatcher: &Dispatcher, resource: &str) -> String {
    let format = dispatcher.format();
    let mut response = serde_json::json!({
        "error": "not_acceptable",
        "message": format!("No acceptable representation of {} was requested", resource),
        "supported": dispatcher.supported_media_types(resource),
    });

    let removed: Vec<serde_json::Value> = dispatcher
        .registry()
        .list_versions(resource)
        .map(|versions| {
            versions
                .filter(|d| !d.is_matchable())
                .map(|d| {
                    let mut entry = serde_json::json!({
                        "media_type": format.for_descriptor(d),
                    });
                    if let Some(successor) = &d.successor {
                        entry["replacement"] = serde_json::Value::String(
                            format.render(&successor.resource, successor.version),
                        );
                    }
                    entry
                })
                .collect()
        })
        .unwrap_or_default();

    if !removed.is_empty() {
        response["removed"] = serde_json::Value::Array(removed);
    }

    serde_json::to_string_pretty(&response).unwrap_or_default()
}

/// Generate a "404 Not Found" response body.
pub fn not_found_body(path: &str) -> String {
    let response = serde_json::json!({
        "error": "not_found",
        "message": format!("No versioned resource is served at {}", path),
    });
    serde_json::to_string_pretty(&response).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ResourceRegistry;
    use crate::version::{VersionDescriptor, VersionRef};
    use std::sync::Arc;

    fn test_dispatcher() -> Dispatcher {
        let mut registry = ResourceRegistry::new();
        registry
            .register(
                VersionDescriptor::deprecated("greeting", 1)
                    .with_successor(VersionRef::new("greeting", 2))
                    .with_sunset_at("2030-06-01T00:00:00Z".parse().unwrap())
                    .with_documentation_url("https://docs.example.com/migration"),
            )
            .unwrap();
        let mut deprecated_at = VersionDescriptor::deprecated("greeting", 2);
        deprecated_at.deprecated_at = Some("2024-01-01T00:00:00Z".parse().unwrap());
        registry.register(deprecated_at).unwrap();
        registry
            .register(VersionDescriptor::active("greeting", 3))
            .unwrap();
        registry
            .register(
                VersionDescriptor::removed("greeting", 16)
                    .with_successor(VersionRef::new("greeting", 3)),
            )
            .unwrap();
        Dispatcher::new(Arc::new(registry), MediaTypeFormat::new("flipfoundry"))
    }

    fn headers_for(dispatcher: &Dispatcher, token: &str) -> HashMap<String, String> {
        let resolution = dispatcher.resolve("greeting", &[token]).unwrap();
        DeprecationHeaders::for_resolution(
            &resolution,
            dispatcher.format(),
            &GlobalSettings::default(),
        )
        .build()
    }

    #[test]
    fn test_deprecation_header() {
        let dispatcher = test_dispatcher();

        let headers = headers_for(&dispatcher, "greeting.v1");
        assert_eq!(headers["Deprecation"], "true");

        // Should contain Unix timestamp
        let headers = headers_for(&dispatcher, "greeting.v2");
        assert!(headers["Deprecation"].starts_with('@'));
    }

    #[test]
    fn test_sunset_header() {
        let dispatcher = test_dispatcher();
        let headers = headers_for(&dispatcher, "greeting.v1");

        // Should be in HTTP date format
        assert!(headers["Sunset"].contains("2030"));
        assert!(headers["Sunset"].ends_with("GMT"));
    }

    #[test]
    fn test_link_header() {
        let dispatcher = test_dispatcher();
        let headers = headers_for(&dispatcher, "greeting.v1");

        let link = &headers["Link"];
        assert!(link.contains("rel=\"deprecation\""));
        assert!(link.contains("rel=\"successor-version\""));
        assert!(link.contains("docs.example.com"));
        assert!(link.contains("application/vnd.flipfoundry.greeting.v2+json"));
    }

    #[test]
    fn test_notice_header() {
        let dispatcher = test_dispatcher();
        let headers = headers_for(&dispatcher, "greeting.v1");

        let notice = &headers["X-Deprecation-Notice"];
        assert!(notice.contains("deprecated"));
        assert!(notice.contains("greeting.v2"));
    }

    #[test]
    fn test_active_resolution_has_no_headers() {
        let dispatcher = test_dispatcher();
        assert!(headers_for(&dispatcher, "greeting.v3").is_empty());
    }

    #[test]
    fn test_format_http_date() {
        let dt: DateTime<Utc> = "2025-06-01T12:00:00Z".parse().unwrap();
        assert_eq!(format_http_date(&dt), "Sun, 01 Jun 2025 12:00:00 GMT");
    }

    #[test]
    fn test_not_acceptable_body() {
        let dispatcher = test_dispatcher();
        let body = not_acceptable_body(&dispatcher, "greeting");
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(value["error"], "not_acceptable");
        assert_eq!(value["supported"].as_array().unwrap().len(), 3);
        assert_eq!(
            value["removed"][0]["media_type"],
            "application/vnd.flipfoundry.greeting.v16+json"
        );
        assert_eq!(
            value["removed"][0]["replacement"],
            "application/vnd.flipfoundry.greeting.v3+json"
        );
    }

    #[test]
    fn test_not_found_body() {
        let body = not_found_body("/flip/unknown");
        assert!(body.contains("not_found"));
        assert!(body.contains("/flip/unknown"));
    }
}
