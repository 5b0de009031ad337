//! Registry of resources and their registered versions.
//!
//! Built once at startup and read-only afterwards, so it can be shared
//! behind an `Arc` without locking.

use crate::error::VersioningError;
use crate::version::{LifecycleState, VersionDescriptor};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Owns every version descriptor, keyed by resource then version.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, BTreeMap<u32, VersionDescriptor>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor.
    ///
    /// Fails with `DuplicateVersion` when the `(resource, version)` pair is
    /// already present and with `InvalidDescriptor` when the descriptor
    /// breaks a lifecycle invariant.
    pub fn register(&mut self, descriptor: VersionDescriptor) -> Result<(), VersioningError> {
        descriptor
            .validate()
            .map_err(|reason| VersioningError::InvalidDescriptor {
                resource: descriptor.resource.clone(),
                version: descriptor.version,
                reason,
            })?;

        let versions = self
            .resources
            .entry(descriptor.resource.clone())
            .or_default();

        if versions.contains_key(&descriptor.version) {
            return Err(VersioningError::DuplicateVersion {
                resource: descriptor.resource,
                version: descriptor.version,
            });
        }

        debug!(
            resource = %descriptor.resource,
            version = descriptor.version,
            state = %descriptor.state,
            "Registered resource version"
        );
        versions.insert(descriptor.version, descriptor);
        Ok(())
    }

    /// Look up one version of a resource, whatever its lifecycle state.
    pub fn lookup(&self, resource: &str, version: u32) -> Result<&VersionDescriptor, VersioningError> {
        self.resources
            .get(resource)
            .and_then(|versions| versions.get(&version))
            .ok_or_else(|| VersioningError::NotFound {
                resource: resource.to_string(),
                version: Some(version),
            })
    }

    /// All versions of a resource, ascending by version number.
    pub fn list_versions(
        &self,
        resource: &str,
    ) -> Result<impl Iterator<Item = &VersionDescriptor> + '_, VersioningError> {
        self.resources
            .get(resource)
            .map(|versions| versions.values())
            .ok_or_else(|| VersioningError::NotFound {
                resource: resource.to_string(),
                version: None,
            })
    }

    pub fn contains_resource(&self, resource: &str) -> bool {
        self.resources.contains_key(resource)
    }

    /// Resource names in lexical order.
    pub fn resources(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.resources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Every descriptor, grouped by resource in lexical order.
    pub fn descriptors(&self) -> impl Iterator<Item = &VersionDescriptor> + '_ {
        self.resources()
            .into_iter()
            .filter_map(|name| self.resources.get(name))
            .flat_map(|versions| versions.values())
    }

    /// Number of registered versions across all resources.
    pub fn len(&self) -> usize {
        self.resources.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count registered versions of a resource in the given state.
    pub fn count_in_state(&self, resource: &str, state: LifecycleState) -> usize {
        self.resources
            .get(resource)
            .map(|versions| versions.values().filter(|d| d.state == state).count())
            .unwrap_or(0)
    }

    /// Check that every successor reference names a registered version.
    pub fn validate_successors(&self) -> Result<(), VersioningError> {
        for descriptor in self.descriptors() {
            if let Some(successor) = &descriptor.successor {
                if self.lookup(&successor.resource, successor.version).is_err() {
                    return Err(VersioningError::UnknownSuccessor {
                        resource: descriptor.resource.clone(),
                        version: descriptor.version,
                        successor: successor.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::VersionRef;

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(VersionDescriptor::active("greeting", 1))
            .unwrap();

        let descriptor = registry.lookup("greeting", 1).unwrap();
        assert_eq!(descriptor.resource, "greeting");
        assert_eq!(descriptor.version, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_version_rejected() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(VersionDescriptor::active("greeting", 1))
            .unwrap();

        let err = registry
            .register(VersionDescriptor::deprecated("greeting", 1))
            .unwrap_err();
        assert_eq!(
            err,
            VersioningError::DuplicateVersion {
                resource: "greeting".to_string(),
                version: 1,
            }
        );
        // The first registration is untouched
        assert_eq!(
            registry.lookup("greeting", 1).unwrap().state,
            LifecycleState::Active
        );
    }

    #[test]
    fn test_same_version_different_resources() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(VersionDescriptor::active("greeting", 1))
            .unwrap();
        registry
            .register(VersionDescriptor::active("departing", 1))
            .unwrap();
        assert_eq!(registry.resources(), vec!["departing", "greeting"]);
    }

    #[test]
    fn test_lookup_not_found() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(VersionDescriptor::active("greeting", 1))
            .unwrap();

        assert!(matches!(
            registry.lookup("greeting", 2),
            Err(VersioningError::NotFound { version: Some(2), .. })
        ));
        assert!(matches!(
            registry.lookup("unknown", 1),
            Err(VersioningError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_versions_ascending() {
        let mut registry = ResourceRegistry::new();
        for version in [7, 2, 4] {
            registry
                .register(VersionDescriptor::active("greeting", version))
                .unwrap();
        }

        let versions: Vec<u32> = registry
            .list_versions("greeting")
            .unwrap()
            .map(|d| d.version)
            .collect();
        assert_eq!(versions, vec![2, 4, 7]);

        // A fresh call starts over
        assert_eq!(registry.list_versions("greeting").unwrap().count(), 3);
        assert!(registry.list_versions("unknown").is_err());
    }

    #[test]
    fn test_removed_versions_stay_registered() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(VersionDescriptor::removed("greeting", 1))
            .unwrap();
        assert!(registry.lookup("greeting", 1).is_ok());
        assert_eq!(registry.count_in_state("greeting", LifecycleState::Removed), 1);
    }

    #[test]
    fn test_invalid_descriptor_rejected() {
        let mut registry = ResourceRegistry::new();
        let err = registry
            .register(VersionDescriptor::active("greeting", 0))
            .unwrap_err();
        assert!(matches!(err, VersioningError::InvalidDescriptor { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_validate_successors() {
        let mut registry = ResourceRegistry::new();
        registry
            .register(
                VersionDescriptor::deprecated("greeting", 1)
                    .with_successor(VersionRef::new("greeting", 2)),
            )
            .unwrap();
        assert!(matches!(
            registry.validate_successors(),
            Err(VersioningError::UnknownSuccessor { .. })
        ));

        registry
            .register(VersionDescriptor::active("greeting", 2))
            .unwrap();
        assert!(registry.validate_successors().is_ok());
    }
}
