//! Persistence seam
//!
//! Builds read every record through [`ServiceStore`]. A missing record is
//! `Ok(None)` (or an empty list), never an error, so callers can tell "absent"
//! apart from "the store failed".

#[cfg(test)]
use mockall::automock;

use portico_common::model::{
    Certificate, HttpRule, PluginMappingPort, RuleExtension, ServiceContext, ServicePort,
    TcpRule, TenantContext,
};
use portico_common::StoreResult;

/// Read-only access to the records a build needs
///
/// Calls are blocking; timeouts and retries belong to the implementation or
/// the caller.
#[cfg_attr(test, automock)]
pub trait ServiceStore: Send + Sync {
    /// Look up a service by id
    fn service(&self, service_id: &str) -> StoreResult<Option<ServiceContext>>;

    /// Look up a tenant by id
    fn tenant(&self, tenant_id: &str) -> StoreResult<Option<TenantContext>>;

    /// All ports of a service
    fn ports(&self, service_id: &str) -> StoreResult<Vec<ServicePort>>;

    /// One port of a service by container port
    fn port(&self, service_id: &str, container_port: i32) -> StoreResult<Option<ServicePort>>;

    /// Whether an upstream network plugin takes over the service's inbound traffic
    fn has_upstream_plugin(&self, service_id: &str) -> StoreResult<bool>;

    /// Port substitutions recorded by the service's upstream plugin
    fn plugin_mapping_ports(&self, service_id: &str) -> StoreResult<Vec<PluginMappingPort>>;

    /// HTTP rule bound to a port (first match)
    fn http_rule(&self, service_id: &str, container_port: i32) -> StoreResult<Option<HttpRule>>;

    /// TCP rule bound to a port (first match)
    fn tcp_rule(&self, service_id: &str, container_port: i32) -> StoreResult<Option<TcpRule>>;

    /// Extensions attached to an HTTP rule
    fn rule_extensions(&self, rule_id: &str) -> StoreResult<Vec<RuleExtension>>;

    /// Look up a certificate by id
    fn certificate(&self, certificate_id: &str) -> StoreResult<Option<Certificate>>;
}
