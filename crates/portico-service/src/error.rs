//! Build error types
//!
//! Every fatal error carries the ids needed to diagnose it without going back
//! to storage. "Not found" and "lookup failed" are separate variants so callers
//! can skip the former and retry the latter.

use portico_common::StoreError;
use thiserror::Error;

/// Errors that abort a build
#[derive(Debug, Error)]
pub enum BuildError {
    /// The service does not exist
    #[error("service {service_id} not found")]
    ServiceNotFound {
        /// Requested service id
        service_id: String,
    },

    /// The service's tenant does not exist
    #[error("tenant {tenant_id} of service {service_id} not found")]
    TenantNotFound {
        /// Service being built
        service_id: String,
        /// Tenant id stored on the service
        tenant_id: String,
    },

    /// An HTTP rule references a certificate that does not exist
    #[error("certificate {certificate_id} referenced by HTTP rule {rule_id} not found")]
    CertificateNotFound {
        /// Rule holding the reference
        rule_id: String,
        /// Referenced certificate id
        certificate_id: String,
    },

    /// A store lookup failed
    #[error("{lookup} lookup for {id} failed: {source}")]
    Lookup {
        /// Which lookup failed (e.g. "ports", "certificate")
        lookup: &'static str,
        /// Key the lookup was made with
        id: String,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// An outer port has neither an HTTP nor a TCP rule
    #[error("no HTTP or TCP rule for outer port {container_port} of service {service_id}")]
    NoRoutingRule {
        /// Service being built
        service_id: String,
        /// Outer container port without a rule
        container_port: i32,
    },

    /// The requested port does not exist on the service
    #[error("port {container_port} of service {service_id} does not exist")]
    PortNotFound {
        /// Service being built
        service_id: String,
        /// Requested container port
        container_port: i32,
    },

    /// The port exists but is not exposed in the requested direction
    #[error("port {container_port} of service {service_id} is not {direction}-exposed")]
    PortNotExposed {
        /// Service being built
        service_id: String,
        /// Requested container port
        container_port: i32,
        /// Requested direction ("inner" or "outer")
        direction: &'static str,
    },
}

impl BuildError {
    /// Create a lookup error
    pub fn lookup(lookup: &'static str, id: impl Into<String>, source: StoreError) -> Self {
        Self::Lookup {
            lookup,
            id: id.into(),
            source,
        }
    }

    /// Whether the error reports a missing record rather than a failure
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ServiceNotFound { .. }
                | Self::TenantNotFound { .. }
                | Self::CertificateNotFound { .. }
                | Self::PortNotFound { .. }
        )
    }

    /// Whether retrying the build might succeed
    ///
    /// Only store failures are transient; everything else is a data problem
    /// that a retry cannot fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Lookup { .. })
    }
}
