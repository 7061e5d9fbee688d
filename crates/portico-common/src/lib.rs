//! Common types for Portico: stored records, build configuration, and utilities

#![deny(missing_docs)]

pub mod annotations;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod telemetry;

pub use annotations::AnnotationPrefix;
pub use config::{BuildConfig, NetworkMode};
pub use error::StoreError;
pub use ids::{IdGenerator, UuidShortIds};

/// Result type alias for persistence lookups
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Label key carrying the creator tag on every generated object
pub const LABEL_CREATOR: &str = "creator";

/// Creator tag value stamped on generated objects
pub const LABEL_CREATOR_PORTICO: &str = "Portico";

/// Label key used by service selectors to bind pods of a tenant service
pub const LABEL_NAME: &str = "name";

/// Label key for the service id
pub const LABEL_SERVICE_ID: &str = "service_id";

/// Label key for the tenant id
pub const LABEL_TENANT_ID: &str = "tenant_id";

/// Label key for the service alias
pub const LABEL_SERVICE_ALIAS: &str = "service_alias";

/// Label key distinguishing inner, outer and stateful services
pub const LABEL_SERVICE_TYPE: &str = "service_type";

/// Label key recording the pre-substitution container port after plugin remapping
pub const LABEL_ORIGIN_PORT: &str = "origin_port";

/// Label and annotation telling the platform to treat endpoints as ready before
/// health checks confirm them
pub const TOLERATE_UNREADY_ENDPOINTS: &str = "portico.io/tolerate-unready-endpoints";

/// Kubernetes annotation letting headless services publish not-ready endpoints
pub const ALPHA_TOLERATE_UNREADY_ENDPOINTS: &str =
    "service.alpha.kubernetes.io/tolerate-unready-endpoints";
