//! Error types for registry and negotiation failures.

/// Errors produced by the resource registry and the dispatcher.
///
/// Every variant is a caller-input or configuration problem. None of them is
/// transient, so nothing here is ever retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersioningError {
    /// The same `(resource, version)` pair was registered twice.
    #[error("Version {version} of resource '{resource}' is already registered")]
    DuplicateVersion { resource: String, version: u32 },

    /// The resource (or the requested version of it) is unknown.
    #[error("{}", not_found_message(.resource, .version))]
    NotFound {
        resource: String,
        version: Option<u32>,
    },

    /// None of the acceptable media types matched a servable version.
    #[error("No acceptable version of resource '{resource}' in {requested:?}")]
    Negotiation {
        resource: String,
        requested: Vec<String>,
    },

    /// A descriptor violates the lifecycle invariants.
    #[error("Invalid descriptor for version {version} of '{resource}': {reason}")]
    InvalidDescriptor {
        resource: String,
        version: u32,
        reason: String,
    },

    /// A successor reference points at nothing that is registered.
    #[error("Version {version} of '{resource}' names unknown successor {successor}")]
    UnknownSuccessor {
        resource: String,
        version: u32,
        successor: String,
    },
}

fn not_found_message(resource: &str, version: &Option<u32>) -> String {
    match version {
        Some(v) => format!("Version {} of resource '{}' not found", v, resource),
        None => format!("Resource '{}' not found", resource),
    }
}

impl VersioningError {
    /// HTTP status the boundary layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            VersioningError::NotFound { .. } => 404,
            VersioningError::Negotiation { .. } => 406,
            VersioningError::DuplicateVersion { .. }
            | VersioningError::InvalidDescriptor { .. }
            | VersioningError::UnknownSuccessor { .. } => 500,
        }
    }

    /// Whether the client can fix this by resending a different request.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
