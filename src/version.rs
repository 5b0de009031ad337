//! Version descriptors and their lifecycle state.
//!
//! A descriptor is pure data: it says which representation a version of a
//! resource produces, whether that version is still servable, and which
//! version replaces it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one resource version.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Servable, no warnings
    #[default]
    Active,
    /// Servable, responses carry deprecation headers
    Deprecated,
    /// Never matched, kept for auditability
    Removed,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Active => "active",
            LifecycleState::Deprecated => "deprecated",
            LifecycleState::Removed => "removed",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A release label such as `1.3` or `4`.
///
/// Integers are accepted and kept in their textual form. Unquoted decimals
/// are refused since YAML reads `1.10` as the float `1.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawMarker", into = "String")]
pub struct ReleaseMarker(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMarker {
    Text(String),
    Int(u64),
    Float(f64),
}

impl TryFrom<RawMarker> for ReleaseMarker {
    type Error = String;

    fn try_from(raw: RawMarker) -> Result<Self, Self::Error> {
        match raw {
            RawMarker::Text(s) => Ok(Self(s)),
            RawMarker::Int(n) => Ok(Self(n.to_string())),
            RawMarker::Float(n) => Err(format!(
                "release markers with a decimal point must be quoted, got the number {}",
                n
            )),
        }
    }
}

impl From<ReleaseMarker> for String {
    fn from(marker: ReleaseMarker) -> Self {
        marker.0
    }
}

impl From<&str> for ReleaseMarker {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl ReleaseMarker {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReleaseMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Informational reference to another registered version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRef {
    pub resource: String,
    pub version: u32,
}

impl VersionRef {
    pub fn new(resource: impl Into<String>, version: u32) -> Self {
        Self {
            resource: resource.into(),
            version,
        }
    }
}

impl fmt::Display for VersionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.v{}", self.resource, self.version)
    }
}

/// One registered `(resource, version)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionDescriptor {
    pub resource: String,
    pub version: u32,
    pub state: LifecycleState,

    /// Release in which the version was deprecated
    pub deprecated_since: Option<ReleaseMarker>,

    /// Last release that still serves the version
    pub removal_after: Option<ReleaseMarker>,

    /// Recommended replacement
    pub successor: Option<VersionRef>,

    /// Schema identifier of the payload; opaque to the dispatcher
    pub representation: String,

    /// Instant of deprecation, used for the Deprecation header
    pub deprecated_at: Option<DateTime<Utc>>,

    /// Instant of removal, used for the Sunset header (RFC 8594)
    pub sunset_at: Option<DateTime<Utc>>,

    pub documentation_url: Option<String>,

    /// Custom deprecation message
    pub message: Option<String>,
}

impl VersionDescriptor {
    /// Create an active descriptor whose representation id defaults to
    /// `<resource>.v<version>`.
    pub fn active(resource: impl Into<String>, version: u32) -> Self {
        let resource = resource.into();
        let representation = format!("{}.v{}", resource, version);
        Self {
            resource,
            version,
            state: LifecycleState::Active,
            deprecated_since: None,
            removal_after: None,
            successor: None,
            representation,
            deprecated_at: None,
            sunset_at: None,
            documentation_url: None,
            message: None,
        }
    }

    /// Create a deprecated descriptor.
    pub fn deprecated(resource: impl Into<String>, version: u32) -> Self {
        Self::active(resource, version).with_state(LifecycleState::Deprecated)
    }

    /// Create a removed descriptor.
    pub fn removed(resource: impl Into<String>, version: u32) -> Self {
        Self::active(resource, version).with_state(LifecycleState::Removed)
    }

    pub fn with_state(mut self, state: LifecycleState) -> Self {
        self.state = state;
        self
    }

    pub fn with_representation(mut self, representation: impl Into<String>) -> Self {
        self.representation = representation.into();
        self
    }

    pub fn with_successor(mut self, successor: VersionRef) -> Self {
        self.successor = Some(successor);
        self
    }

    pub fn with_deprecated_since(mut self, marker: impl Into<ReleaseMarker>) -> Self {
        self.deprecated_since = Some(marker.into());
        self
    }

    pub fn with_removal_after(mut self, marker: impl Into<ReleaseMarker>) -> Self {
        self.removal_after = Some(marker.into());
        self
    }

    pub fn with_sunset_at(mut self, sunset_at: DateTime<Utc>) -> Self {
        self.sunset_at = Some(sunset_at);
        self
    }

    pub fn with_documentation_url(mut self, url: impl Into<String>) -> Self {
        self.documentation_url = Some(url.into());
        self
    }

    /// Reference to this descriptor.
    pub fn to_ref(&self) -> VersionRef {
        VersionRef::new(self.resource.clone(), self.version)
    }

    /// Whether the dispatcher may ever select this version.
    pub fn is_matchable(&self) -> bool {
        self.state != LifecycleState::Removed
    }

    pub fn is_deprecated(&self) -> bool {
        self.state == LifecycleState::Deprecated
    }

    /// Check if the version has passed its sunset date.
    pub fn is_past_sunset(&self) -> bool {
        self.sunset_at
            .map(|sunset| Utc::now() > sunset)
            .unwrap_or(false)
    }

    /// Check the lifecycle invariants, returning the violated rule.
    pub fn validate(&self) -> Result<(), String> {
        if self.resource.is_empty() {
            return Err("resource name cannot be empty".to_string());
        }
        if self.version == 0 {
            return Err("version must be a positive integer".to_string());
        }
        if self.representation.is_empty() {
            return Err("representation cannot be empty".to_string());
        }
        if self.state == LifecycleState::Active {
            let lifecycle_fields = [
                ("deprecated_since", self.deprecated_since.is_some()),
                ("removal_after", self.removal_after.is_some()),
                ("deprecated_at", self.deprecated_at.is_some()),
                ("sunset_at", self.sunset_at.is_some()),
            ];
            if let Some((field, _)) = lifecycle_fields.iter().find(|(_, set)| *set) {
                return Err(format!("{} is only allowed on non-active versions", field));
            }
        }
        if let Some(successor) = &self.successor {
            if successor.resource == self.resource && successor.version == self.version {
                return Err("a version cannot be its own successor".to_string());
            }
        }
        Ok(())
    }

    /// Get the deprecation warning message.
    ///
    /// `media_type` is this version's media type, `successor_media_type` the
    /// one clients should migrate to.
    pub fn deprecation_message(
        &self,
        media_type: &str,
        successor_media_type: Option<&str>,
    ) -> String {
        if let Some(msg) = &self.message {
            return msg.clone();
        }

        let mut message = format!("This representation ({}) is deprecated", media_type);

        if let Some(since) = &self.deprecated_since {
            message.push_str(&format!(" since release {}", since));
        }

        if let Some(sunset) = &self.sunset_at {
            message.push_str(&format!(
                " and will be removed on {}",
                sunset.format("%Y-%m-%d")
            ));
        } else if let Some(after) = &self.removal_after {
            message.push_str(&format!(" and will be removed after release {}", after));
        }

        if let Some(successor) = successor_media_type {
            message.push_str(&format!(". Please migrate to {}", successor));
        }

        if let Some(docs) = &self.documentation_url {
            message.push_str(&format!(". See {} for migration guide", docs));
        }

        message.push('.');
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_representation() {
        let descriptor = VersionDescriptor::active("greeting", 2);
        assert_eq!(descriptor.representation, "greeting.v2");
        assert_eq!(descriptor.state, LifecycleState::Active);
        assert!(descriptor.is_matchable());
        assert!(!descriptor.is_deprecated());
    }

    #[test]
    fn test_removed_is_not_matchable() {
        let descriptor = VersionDescriptor::removed("greeting", 1);
        assert!(!descriptor.is_matchable());
    }

    #[test]
    fn test_active_rejects_lifecycle_markers() {
        let descriptor = VersionDescriptor::active("greeting", 1).with_deprecated_since("1.3");
        let err = descriptor.validate().unwrap_err();
        assert!(err.contains("deprecated_since"));

        let descriptor = VersionDescriptor::deprecated("greeting", 1).with_deprecated_since("1.3");
        assert!(descriptor.validate().is_ok());
    }

    #[test]
    fn test_zero_version_rejected() {
        assert!(VersionDescriptor::active("greeting", 0).validate().is_err());
    }

    #[test]
    fn test_self_successor_rejected() {
        let descriptor = VersionDescriptor::deprecated("greeting", 1)
            .with_successor(VersionRef::new("greeting", 1));
        assert!(descriptor.validate().is_err());
    }

    #[test]
    fn test_release_marker_from_yaml() {
        let marker: ReleaseMarker = serde_yaml::from_str("\"1.10\"").unwrap();
        assert_eq!(marker.as_str(), "1.10");

        let marker: ReleaseMarker = serde_yaml::from_str("4").unwrap();
        assert_eq!(marker.as_str(), "4");

        let marker: ReleaseMarker = serde_yaml::from_str("\"2024-Q3\"").unwrap();
        assert_eq!(marker.as_str(), "2024-Q3");
    }

    #[test]
    fn test_unquoted_decimal_marker_rejected() {
        let err = serde_yaml::from_str::<ReleaseMarker>("1.10").unwrap_err();
        assert!(err.to_string().contains("must be quoted"));
        assert!(serde_yaml::from_str::<ReleaseMarker>("2.0").is_err());
    }

    #[test]
    fn test_deprecation_message() {
        let descriptor = VersionDescriptor::deprecated("greeting", 1)
            .with_deprecated_since("1.3")
            .with_sunset_at("2030-06-01T00:00:00Z".parse().unwrap())
            .with_documentation_url("https://docs.example.com/greeting");

        let msg = descriptor.deprecation_message(
            "application/vnd.flipfoundry.greeting.v1+json",
            Some("application/vnd.flipfoundry.greeting.v2+json"),
        );
        assert!(msg.contains("greeting.v1"));
        assert!(msg.contains("since release 1.3"));
        assert!(msg.contains("2030-06-01"));
        assert!(msg.contains("greeting.v2"));
        assert!(msg.contains("docs.example.com"));
    }

    #[test]
    fn test_removal_after_in_message() {
        let descriptor = VersionDescriptor::deprecated("greeting", 1).with_removal_after("2.0");
        let msg = descriptor.deprecation_message("greeting.v1", None);
        assert!(msg.contains("removed after release 2.0"));
        assert!(msg.ends_with('.'));
    }

    #[test]
    fn test_custom_message() {
        let mut descriptor = VersionDescriptor::deprecated("greeting", 1);
        descriptor.message = Some("Custom deprecation message".to_string());
        assert_eq!(
            descriptor.deprecation_message("greeting.v1", None),
            "Custom deprecation message"
        );
    }
}
