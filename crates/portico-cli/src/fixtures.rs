//! File-backed service store
//!
//! Loads every record a build needs from a single YAML document so builds can
//! be rendered without a database.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use portico_common::model::{
    Certificate, HttpRule, PluginMappingPort, ReplicationKind, RuleExtension, ServiceContext,
    ServicePort, TcpRule, TenantContext, UPSTREAM_NET_PLUGIN,
};
use portico_common::StoreResult;
use portico_service::ServiceStore;

use crate::{Error, Result};

/// A plugin attached to a service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginRelation {
    pub service_id: String,
    pub plugin_model: String,
    /// Disabled plugins are ignored
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// Records loaded from a fixture file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FixtureStore {
    pub services: Vec<ServiceContext>,
    pub tenants: Vec<TenantContext>,
    pub ports: Vec<ServicePort>,
    pub plugin_relations: Vec<PluginRelation>,
    pub plugin_ports: Vec<PluginMappingPort>,
    pub http_rules: Vec<HttpRule>,
    pub tcp_rules: Vec<TcpRule>,
    pub rule_extensions: Vec<RuleExtension>,
    pub certificates: Vec<Certificate>,
}

impl FixtureStore {
    /// Read and validate a fixture file
    pub fn load(path: &Path) -> Result<Self> {
        let read = || -> Result<Self> {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml(&content)
        };
        let store = read().map_err(|e| Error::fixtures(path, e))?;
        debug!(
            path = %path.display(),
            services = store.services.len(),
            ports = store.ports.len(),
            "loaded fixtures"
        );
        Ok(store)
    }

    /// Parse and validate fixtures from YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        let store: Self = serde_yaml::from_str(content)?;
        store.validate()?;
        Ok(store)
    }

    /// Reject fixtures whose lookups would be ambiguous
    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for service in &self.services {
            if !seen.insert(service.service_id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate service id '{}'",
                    service.service_id
                )));
            }
        }

        let mut seen = HashSet::new();
        for tenant in &self.tenants {
            if !seen.insert(tenant.tenant_id.as_str()) {
                return Err(Error::validation(format!(
                    "duplicate tenant id '{}'",
                    tenant.tenant_id
                )));
            }
        }

        let mut seen = HashSet::new();
        for port in &self.ports {
            if !seen.insert((port.service_id.as_str(), port.container_port)) {
                return Err(Error::validation(format!(
                    "duplicate container port {} on service '{}'",
                    port.container_port, port.service_id
                )));
            }
        }

        Ok(())
    }

    /// Replication recorded on a service, if the service exists
    pub fn replication_of(&self, service_id: &str) -> Option<ReplicationKind> {
        self.services
            .iter()
            .find(|s| s.service_id == service_id)
            .map(|s| s.replication)
    }
}

impl ServiceStore for FixtureStore {
    fn service(&self, service_id: &str) -> StoreResult<Option<ServiceContext>> {
        Ok(self
            .services
            .iter()
            .find(|s| s.service_id == service_id)
            .cloned())
    }

    fn tenant(&self, tenant_id: &str) -> StoreResult<Option<TenantContext>> {
        Ok(self
            .tenants
            .iter()
            .find(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    fn ports(&self, service_id: &str) -> StoreResult<Vec<ServicePort>> {
        Ok(self
            .ports
            .iter()
            .filter(|p| p.service_id == service_id)
            .cloned()
            .collect())
    }

    fn port(&self, service_id: &str, container_port: i32) -> StoreResult<Option<ServicePort>> {
        Ok(self
            .ports
            .iter()
            .find(|p| p.service_id == service_id && p.container_port == container_port)
            .cloned())
    }

    fn has_upstream_plugin(&self, service_id: &str) -> StoreResult<bool> {
        Ok(self.plugin_relations.iter().any(|r| {
            r.enabled && r.service_id == service_id && r.plugin_model == UPSTREAM_NET_PLUGIN
        }))
    }

    fn plugin_mapping_ports(&self, service_id: &str) -> StoreResult<Vec<PluginMappingPort>> {
        Ok(self
            .plugin_ports
            .iter()
            .filter(|p| p.service_id == service_id && p.plugin_model == UPSTREAM_NET_PLUGIN)
            .cloned()
            .collect())
    }

    fn http_rule(&self, service_id: &str, container_port: i32) -> StoreResult<Option<HttpRule>> {
        Ok(self
            .http_rules
            .iter()
            .find(|r| r.service_id == service_id && r.container_port == container_port)
            .cloned())
    }

    fn tcp_rule(&self, service_id: &str, container_port: i32) -> StoreResult<Option<TcpRule>> {
        Ok(self
            .tcp_rules
            .iter()
            .find(|r| r.service_id == service_id && r.container_port == container_port)
            .cloned())
    }

    fn rule_extensions(&self, rule_id: &str) -> StoreResult<Vec<RuleExtension>> {
        Ok(self
            .rule_extensions
            .iter()
            .filter(|e| e.rule_id == rule_id)
            .cloned()
            .collect())
    }

    fn certificate(&self, certificate_id: &str) -> StoreResult<Option<Certificate>> {
        Ok(self
            .certificates
            .iter()
            .find(|c| c.certificate_id == certificate_id)
            .cloned())
    }
}
