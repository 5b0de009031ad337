//! Configuration for the API versioning gateway.
//!
//! Declares the vendor tree, the resources with their registered versions
//! and lifecycle state, header names, and metrics options.

use crate::error::VersioningError;
use crate::media_type::{is_valid_resource_name, is_valid_vendor, MediaTypeFormat};
use crate::registry::ResourceRegistry;
use crate::version::{LifecycleState, ReleaseMarker, VersionDescriptor, VersionRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Configuration shipped with the binary.
pub const DEFAULT_CONFIG: &str = include_str!("../config/default-config.yaml");

/// Main configuration for API versioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersioningConfig {
    /// Vendor tree segment of media types (`vnd.<vendor>.…`)
    #[serde(default = "default_vendor")]
    pub vendor: String,

    /// Structured syntax suffix of media types, `null` for none
    #[serde(default = "default_media_suffix")]
    pub media_suffix: Option<String>,

    /// Versioned resources
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_vendor() -> String {
    "zentinel".to_string()
}

fn default_media_suffix() -> Option<String> {
    Some("json".to_string())
}

impl VersioningConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse, compile and validate a YAML configuration.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let mut config: Self = serde_yaml::from_str(yaml)?;
        config.compile()?;
        config.validate()?;
        Ok(config)
    }

    /// The configuration bundled with the binary.
    pub fn bundled() -> anyhow::Result<Self> {
        Self::from_yaml(DEFAULT_CONFIG)
    }

    /// Compile path patterns into matchers.
    pub fn compile(&mut self) -> anyhow::Result<()> {
        for resource in &mut self.resources {
            resource.compile()?;
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !is_valid_vendor(&self.vendor) {
            anyhow::bail!("Invalid vendor '{}'", self.vendor);
        }

        // Media types compare case-insensitively, so names do too
        let mut names = HashSet::new();
        for resource in &self.resources {
            resource.validate()?;
            if !names.insert(resource.name.to_ascii_lowercase()) {
                anyhow::bail!("Resource '{}' is declared more than once", resource.name);
            }
        }

        // Duplicate versions and dangling successors surface here
        self.build_registry()?;
        Ok(())
    }

    /// Build the resource registry from the declared versions.
    pub fn build_registry(&self) -> Result<ResourceRegistry, VersioningError> {
        let mut registry = ResourceRegistry::new();
        for resource in &self.resources {
            for version in &resource.versions {
                registry.register(version.to_descriptor(&resource.name))?;
            }
        }
        registry.validate_successors()?;
        Ok(registry)
    }

    /// Media type rendering for this vendor.
    pub fn media_format(&self) -> MediaTypeFormat {
        MediaTypeFormat::new(&self.vendor).with_suffix(self.media_suffix.clone())
    }

    /// Find the resource serving a request path.
    pub fn find_resource(&self, path: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.matches_path(path))
    }
}

/// A versioned resource and the request paths that serve it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Resource name as it appears in media types
    pub name: String,

    /// Path pattern to match (supports glob patterns like /flip/greeting/*).
    /// Defaults to `/<name>`.
    #[serde(default)]
    pub path: Option<String>,

    /// Registered versions
    #[serde(default)]
    pub versions: Vec<VersionConfig>,

    /// Compiled path matcher (not serialized)
    #[serde(skip)]
    pub path_matcher: Option<globset::GlobMatcher>,
}

impl ResourceConfig {
    /// The effective path pattern.
    pub fn path_pattern(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| format!("/{}", self.name))
    }

    fn compile(&mut self) -> anyhow::Result<()> {
        let pattern = self.path_pattern();
        if is_glob(&pattern) {
            let glob = globset::Glob::new(&pattern).map_err(|e| {
                anyhow::anyhow!("Invalid path pattern for resource {}: {}", self.name, e)
            })?;
            self.path_matcher = Some(glob.compile_matcher());
        }
        Ok(())
    }

    /// Validate the resource configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Resource name cannot be empty");
        }
        if !is_valid_resource_name(&self.name) {
            anyhow::bail!(
                "Invalid resource name '{}': must start with a letter or digit, contain only letters, digits, '.', '_' or '-', and not end in a version suffix",
                self.name
            );
        }
        if self.path.as_deref() == Some("") {
            anyhow::bail!("Resource path cannot be empty for resource: {}", self.name);
        }
        if self.versions.is_empty() {
            anyhow::bail!("Resource {} declares no versions", self.name);
        }

        for version in &self.versions {
            // Validate sunset date is in the future for deprecated versions
            if let (Some(sunset), LifecycleState::Deprecated) = (&version.sunset_at, &version.status)
            {
                if *sunset < Utc::now() {
                    tracing::warn!(
                        resource = %self.name,
                        version = version.version,
                        sunset = %sunset,
                        "Sunset date is in the past but status is still 'deprecated'"
                    );
                }
            }
        }

        Ok(())
    }

    /// Check if the request path is served by this resource.
    pub fn matches_path(&self, path: &str) -> bool {
        if let Some(matcher) = &self.path_matcher {
            return matcher.is_match(path);
        }

        let pattern = self.path_pattern();
        if is_glob(&pattern) {
            // Not compiled yet
            return globset::Glob::new(&pattern)
                .map(|glob| glob.compile_matcher().is_match(path))
                .unwrap_or(false);
        }

        // Exact match or prefix match with trailing slash
        path == pattern
            || path.starts_with(&format!("{}/", pattern))
            || (pattern.ends_with('/') && path.starts_with(&pattern))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// One registered version of a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionConfig {
    /// Positive version number
    pub version: u32,

    /// Lifecycle state
    #[serde(default)]
    pub status: LifecycleState,

    /// Release in which the version was deprecated
    #[serde(default)]
    pub deprecated_since: Option<ReleaseMarker>,

    /// Last release that serves the version
    #[serde(default)]
    pub removal_after: Option<ReleaseMarker>,

    /// Date when the version was deprecated (RFC 3339)
    #[serde(default)]
    pub deprecated_at: Option<DateTime<Utc>>,

    /// Date when the version will be/was removed (RFC 3339)
    /// Used for the Sunset header (RFC 8594)
    #[serde(default)]
    pub sunset_at: Option<DateTime<Utc>>,

    /// Recommended replacement
    #[serde(default)]
    pub successor: Option<SuccessorConfig>,

    /// Representation schema id, defaults to `<resource>.v<version>`
    #[serde(default)]
    pub representation: Option<String>,

    /// Link to migration documentation
    #[serde(default)]
    pub documentation_url: Option<String>,

    /// Custom deprecation message
    #[serde(default)]
    pub message: Option<String>,
}

impl VersionConfig {
    /// Convert into a registry descriptor for `resource`.
    pub fn to_descriptor(&self, resource: &str) -> VersionDescriptor {
        let mut descriptor = VersionDescriptor::active(resource, self.version).with_state(self.status);
        if let Some(representation) = &self.representation {
            descriptor = descriptor.with_representation(representation.clone());
        }
        descriptor.deprecated_since = self.deprecated_since.clone();
        descriptor.removal_after = self.removal_after.clone();
        descriptor.deprecated_at = self.deprecated_at;
        descriptor.sunset_at = self.sunset_at;
        descriptor.successor = self.successor.as_ref().map(|s| s.to_ref(resource));
        descriptor.documentation_url = self.documentation_url.clone();
        descriptor.message = self.message.clone();
        descriptor
    }
}

/// Successor reference; the resource defaults to the declaring one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SuccessorConfig {
    #[serde(default)]
    pub resource: Option<String>,
    pub version: u32,
}

impl SuccessorConfig {
    fn to_ref(&self, declaring_resource: &str) -> VersionRef {
        VersionRef::new(
            self.resource
                .clone()
                .unwrap_or_else(|| declaring_resource.to_string()),
            self.version,
        )
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Header name for deprecation warnings (default: Deprecation)
    #[serde(default = "default_deprecation_header")]
    pub deprecation_header: String,

    /// Header name for sunset date (default: Sunset)
    #[serde(default = "default_sunset_header")]
    pub sunset_header: String,

    /// Header name for documentation and successor links (default: Link)
    #[serde(default = "default_link_header")]
    pub link_header: String,

    /// Header name for deprecation message (default: X-Deprecation-Notice)
    #[serde(default = "default_notice_header")]
    pub notice_header: String,

    /// Whether to add deprecation headers to responses of deprecated versions
    #[serde(default = "default_true")]
    pub include_headers: bool,

    /// Whether to log every access to a deprecated version
    #[serde(default = "default_true")]
    pub log_access: bool,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            deprecation_header: default_deprecation_header(),
            sunset_header: default_sunset_header(),
            link_header: default_link_header(),
            notice_header: default_notice_header(),
            include_headers: true,
            log_access: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_deprecation_header() -> String {
    "Deprecation".to_string()
}

fn default_sunset_header() -> String {
    "Sunset".to_string()
}

fn default_link_header() -> String {
    "Link".to_string()
}

fn default_notice_header() -> String {
    "X-Deprecation-Notice".to_string()
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Whether to record Prometheus metrics
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Prefix for metric names
    #[serde(default = "default_metrics_prefix")]
    pub prefix: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: default_metrics_prefix(),
        }
    }
}

fn default_metrics_prefix() -> String {
    "zentinel_api_versioning".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_basic_config() {
        let yaml = r#"
vendor: flipfoundry
resources:
  - name: greeting
    path: /flip/greeting/*
    versions:
      - version: 1
        status: deprecated
        deprecated_since: "1.3"
        successor:
          version: 2
      - version: 2
"#;
        let config = VersioningConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.resources.len(), 1);
        let greeting = &config.resources[0];
        assert_eq!(greeting.name, "greeting");
        assert_eq!(greeting.versions.len(), 2);
        assert_eq!(greeting.versions[0].status, LifecycleState::Deprecated);
        assert_eq!(greeting.versions[1].status, LifecycleState::Active);
        assert_eq!(
            greeting.versions[0].deprecated_since.as_ref().map(|m| m.as_str()),
            Some("1.3")
        );
    }

    #[test]
    fn test_release_markers_keep_their_text() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
        status: deprecated
        deprecated_since: "1.10"
        removal_after: 3
"#;
        let config = VersioningConfig::from_yaml(yaml).unwrap();
        let registry = config.build_registry().unwrap();
        let descriptor = registry.lookup("greeting", 1).unwrap();
        assert_eq!(descriptor.deprecated_since, Some(ReleaseMarker::from("1.10")));
        assert_eq!(descriptor.removal_after, Some(ReleaseMarker::from("3")));
    }

    #[test]
    fn test_unquoted_decimal_marker_rejected() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
        status: deprecated
        deprecated_since: 1.10
"#;
        let err = VersioningConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("must be quoted"));
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let config = VersioningConfig::bundled().unwrap();
        assert_eq!(config.vendor, "flipfoundry");

        let registry = config.build_registry().unwrap();
        assert!(registry.lookup("greeting", 1).unwrap().is_deprecated());
        assert!(registry.lookup("greeting", 2).is_ok());
        assert!(registry.lookup("departing", 1).is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEFAULT_CONFIG.as_bytes()).unwrap();

        let config = VersioningConfig::from_file(file.path()).unwrap();
        assert_eq!(config.resources.len(), 2);
    }

    #[test]
    fn test_duplicate_version_is_fatal() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
      - version: 1
"#;
        let err = VersioningConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_unknown_successor_rejected() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
        status: deprecated
        successor:
          resource: salutation
          version: 1
"#;
        assert!(VersioningConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_cross_resource_successor() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
        status: deprecated
        successor:
          resource: salutation
          version: 1
  - name: salutation
    versions:
      - version: 1
"#;
        let config = VersioningConfig::from_yaml(yaml).unwrap();
        let registry = config.build_registry().unwrap();
        let successor = registry.lookup("greeting", 1).unwrap().successor.clone();
        assert_eq!(successor, Some(VersionRef::new("salutation", 1)));
    }

    #[test]
    fn test_active_with_sunset_rejected() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
        sunset_at: "2030-01-01T00:00:00Z"
"#;
        let err = VersioningConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("sunset_at"));
    }

    #[test]
    fn test_duplicate_resource_rejected() {
        let yaml = r#"
resources:
  - name: greeting
    versions: [{ version: 1 }]
  - name: greeting
    versions: [{ version: 2 }]
"#;
        assert!(VersioningConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_unparseable_resource_names_rejected() {
        for name in ["_greeting", "-greeting", "\"greeting card\"", "flip/greeting", "greeting.v2"] {
            let yaml = format!(
                "vendor: acme\nresources:\n  - name: {}\n    versions: [{{ version: 1 }}]\n",
                name
            );
            let err = VersioningConfig::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("Invalid resource name"), "name: {name}");
        }
    }

    #[test]
    fn test_resource_names_differing_in_case_rejected() {
        let yaml = r#"
resources:
  - name: greeting
    versions: [{ version: 1 }]
  - name: Greeting
    path: /other
    versions: [{ version: 1 }]
"#;
        assert!(VersioningConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_vendor_rejected() {
        for vendor in ["_acme", "-acme", "ac.me", "\"\""] {
            let yaml = format!(
                "vendor: {}\nresources:\n  - name: greeting\n    versions: [{{ version: 1 }}]\n",
                vendor
            );
            let err = VersioningConfig::from_yaml(&yaml).unwrap_err();
            assert!(err.to_string().contains("Invalid vendor"), "vendor: {vendor}");
        }
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let yaml = r#"
resources:
  - name: greeting
    versions:
      - version: 1
        colour: blue
"#;
        assert!(VersioningConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_find_resource_by_glob() {
        let config = VersioningConfig::bundled().unwrap();
        assert_eq!(
            config.find_resource("/flip/departing/depart").map(|r| r.name.as_str()),
            Some("departing")
        );
        assert_eq!(
            config.find_resource("/flip/greeting/hello").map(|r| r.name.as_str()),
            Some("greeting")
        );
        assert!(config.find_resource("/flip/unknown/x").is_none());
    }

    #[test]
    fn test_default_path_prefix_matching() {
        let yaml = r#"
resources:
  - name: greeting
    versions: [{ version: 1 }]
"#;
        let config = VersioningConfig::from_yaml(yaml).unwrap();
        assert!(config.find_resource("/greeting").is_some());
        assert!(config.find_resource("/greeting/hello").is_some());
        assert!(config.find_resource("/greetings").is_none());
    }

    #[test]
    fn test_media_format() {
        let yaml = r#"
vendor: acme
media_suffix: null
resources:
  - name: greeting
    versions: [{ version: 1 }]
"#;
        let config = VersioningConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config.media_format().render("greeting", 1),
            "application/vnd.acme.greeting.v1"
        );
    }
}
