//! Zentinel API Versioning
//!
//! Negotiates which version of a resource representation to serve from the
//! client's `Accept` header, and manages the deprecation lifecycle of those
//! versions.
//!
//! # Features
//!
//! - **Media-type versioning**: `application/vnd.<vendor>.<resource>.v<n>+json`
//! - **Explicit preference**: the first acceptable version wins, clients are
//!   never upgraded behind their back
//! - **Lifecycle state**: active, deprecated, and removed versions
//! - **Deprecation headers**: Deprecation, Sunset (RFC 8594), and successor links
//! - **Usage Tracking**: Prometheus metrics for negotiated versions
//!
//! # Example Configuration
//!
//! ```yaml
//! vendor: flipfoundry
//! resources:
//!   - name: greeting
//!     path: /flip/greeting/*
//!     versions:
//!       - version: 1
//!         status: deprecated
//!         deprecated_since: "1.3"
//!         successor:
//!           version: 2
//!       - version: 2
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod headers;
pub mod media_type;
pub mod metrics;
pub mod registry;
pub mod representations;
pub mod version;

pub use config::VersioningConfig;
pub use dispatcher::{Dispatcher, Resolution};
pub use error::VersioningError;
pub use gateway::{GatewayRequest, GatewayResponse, VersionGateway};
pub use registry::ResourceRegistry;
pub use version::{LifecycleState, VersionDescriptor, VersionRef};
