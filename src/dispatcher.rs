//! Version negotiation against the resource registry.
//!
//! The dispatcher is a pure function of the registry and the client's
//! acceptable media types. It holds no mutable state and may be shared
//! freely between request handlers.

use crate::error::VersioningError;
use crate::media_type::{parse_accept, MediaTypeFormat, VersionToken};
use crate::registry::ResourceRegistry;
use crate::version::VersionDescriptor;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a successful negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    /// Version selected for the response
    pub descriptor: &'a VersionDescriptor,

    /// Recommended replacement, set only when the selected version is
    /// deprecated
    pub successor: Option<&'a VersionDescriptor>,

    /// Canonical media type of the selected representation
    pub media_type: String,
}

impl Resolution<'_> {
    pub fn is_deprecated(&self) -> bool {
        self.descriptor.is_deprecated()
    }
}

/// Resolves `(resource, acceptable media types)` to a registered version.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<ResourceRegistry>,
    format: MediaTypeFormat,
}

impl Dispatcher {
    pub fn new(registry: Arc<ResourceRegistry>, format: MediaTypeFormat) -> Self {
        Self { registry, format }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn format(&self) -> &MediaTypeFormat {
        &self.format
    }

    /// Select a version of `resource` from candidates in client preference
    /// order.
    ///
    /// The first candidate naming a registered, non-removed version of the
    /// resource wins. A later candidate is never preferred over an earlier
    /// one, even if it names a newer version.
    pub fn resolve<S: AsRef<str>>(
        &self,
        resource: &str,
        candidates: &[S],
    ) -> Result<Resolution<'_>, VersioningError> {
        if !self.registry.contains_resource(resource) {
            return Err(VersioningError::NotFound {
                resource: resource.to_string(),
                version: None,
            });
        }

        for candidate in candidates {
            let candidate = candidate.as_ref();
            let Some(token) = VersionToken::parse(candidate) else {
                debug!(candidate = %candidate, "Discarding malformed media type");
                continue;
            };

            if !self.format.accepts(&token) {
                debug!(candidate = %candidate, "Discarding media type outside our vendor tree");
                continue;
            }

            if !token.resource.eq_ignore_ascii_case(resource) {
                continue;
            }

            let Ok(descriptor) = self.registry.lookup(resource, token.version) else {
                debug!(resource = %resource, version = token.version, "Version not registered");
                continue;
            };

            if !descriptor.is_matchable() {
                debug!(resource = %resource, version = token.version, "Version removed");
                continue;
            }

            return Ok(self.resolution_for(descriptor));
        }

        Err(VersioningError::Negotiation {
            resource: resource.to_string(),
            requested: candidates.iter().map(|c| c.as_ref().to_string()).collect(),
        })
    }

    /// Negotiate from a raw `Accept` header value.
    pub fn resolve_accept(
        &self,
        resource: &str,
        accept: &str,
    ) -> Result<Resolution<'_>, VersioningError> {
        self.resolve(resource, &parse_accept(accept))
    }

    fn resolution_for<'a>(&'a self, descriptor: &'a VersionDescriptor) -> Resolution<'a> {
        let successor = if descriptor.is_deprecated() {
            descriptor
                .successor
                .as_ref()
                .and_then(|s| self.registry.lookup(&s.resource, s.version).ok())
        } else {
            None
        };

        debug!(
            resource = %descriptor.resource,
            version = descriptor.version,
            deprecated = descriptor.is_deprecated(),
            "Negotiated resource version"
        );

        Resolution {
            descriptor,
            successor,
            media_type: self.format.for_descriptor(descriptor),
        }
    }

    /// Media types a client may request for a resource.
    pub fn supported_media_types(&self, resource: &str) -> Vec<String> {
        self.registry
            .list_versions(resource)
            .map(|versions| {
                versions
                    .filter(|d| d.is_matchable())
                    .map(|d| self.format.for_descriptor(d))
                    .collect()
            })
            .unwrap_or_default()
    }
}
