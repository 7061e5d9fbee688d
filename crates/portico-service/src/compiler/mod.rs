//! Build orchestration for a tenant service
//!
//! [`AppServiceBuild`] loads a service and its tenant once, then drives the
//! specialized builders in order:
//! - [`remap_plugin_ports`](crate::plugin::remap_plugin_ports) when an upstream plugin owns inbound traffic
//! - [`ServiceSynthesizer`](crate::workload::ServiceSynthesizer) for inner, outer and headless Services
//! - [`RouteCompiler`](crate::ingress::RouteCompiler) for the Ingresses and TLS Secrets of outer ports
//!
//! # Usage
//!
//! ```text
//! let build = AppServiceBuild::load(&store, &UuidShortIds, &config, "svc-1", ReplicationKind::Stateless)?;
//! let output = build.build()?;
//! // output.services, output.ingresses, output.secrets
//! ```
//!
//! A build either produces every resource for the service or fails; nothing
//! partial is returned.

use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use tracing::{debug, info, instrument};

use portico_common::model::{ReplicationKind, ServiceContext, TenantContext};
use portico_common::{BuildConfig, IdGenerator};

use crate::error::BuildError;
use crate::ingress::{GeneratedRoutes, RouteCompiler};
use crate::plugin::{label_origin_ports, remap_plugin_ports};
use crate::store::ServiceStore;
use crate::workload::ServiceSynthesizer;

/// Networking resources produced for one service
#[derive(Clone, Debug, Default)]
pub struct CompiledNetwork {
    /// Inner, outer and headless Services
    pub services: Vec<Service>,
    /// HTTP and TCP Ingresses
    pub ingresses: Vec<Ingress>,
    /// TLS Secrets referenced by Ingresses
    pub secrets: Vec<Secret>,
}

impl CompiledNetwork {
    /// Create empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any resources were generated
    pub fn is_empty(&self) -> bool {
        self.services.is_empty() && self.ingresses.is_empty() && self.secrets.is_empty()
    }

    /// Total count of all generated resources
    pub fn resource_count(&self) -> usize {
        self.services.len() + self.ingresses.len() + self.secrets.len()
    }

    fn push_routes(&mut self, routes: GeneratedRoutes) {
        self.ingresses.extend(routes.ingresses);
        self.secrets.extend(routes.secret);
    }

    /// Serialize every resource for submission, services first
    ///
    /// Each manifest carries its `apiVersion` and `kind`.
    pub fn to_manifests(&self) -> Result<Vec<serde_json::Value>, serde_json::Error> {
        let services = self.services.iter().map(serde_json::to_value);
        let ingresses = self.ingresses.iter().map(serde_json::to_value);
        let secrets = self.secrets.iter().map(serde_json::to_value);
        services.chain(ingresses).chain(secrets).collect()
    }
}

/// Builds the Services, Ingresses and Secrets that expose one tenant service
pub struct AppServiceBuild<'a> {
    store: &'a dyn ServiceStore,
    ids: &'a dyn IdGenerator,
    config: &'a BuildConfig,
    service: ServiceContext,
    tenant: TenantContext,
    replication: ReplicationKind,
    event_id: Option<String>,
}

impl<'a> AppServiceBuild<'a> {
    /// Load the service and its tenant
    ///
    /// # Errors
    ///
    /// Returns `ServiceNotFound` / `TenantNotFound` when a record is missing
    /// and `Lookup` when the store fails.
    pub fn load(
        store: &'a dyn ServiceStore,
        ids: &'a dyn IdGenerator,
        config: &'a BuildConfig,
        service_id: &str,
        replication: ReplicationKind,
    ) -> Result<Self, BuildError> {
        let service = store
            .service(service_id)
            .map_err(|e| BuildError::lookup("service", service_id, e))?
            .ok_or_else(|| BuildError::ServiceNotFound {
                service_id: service_id.to_string(),
            })?;

        let tenant = store
            .tenant(&service.tenant_id)
            .map_err(|e| BuildError::lookup("tenant", &service.tenant_id, e))?
            .ok_or_else(|| BuildError::TenantNotFound {
                service_id: service_id.to_string(),
                tenant_id: service.tenant_id.clone(),
            })?;

        Ok(Self {
            store,
            ids,
            config,
            service,
            tenant,
            replication,
            event_id: None,
        })
    }

    /// Stamp outer services with the event that triggered the build
    pub fn with_event_id(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    /// The loaded service
    pub fn service(&self) -> &ServiceContext {
        &self.service
    }

    /// The loaded tenant
    pub fn tenant(&self) -> &TenantContext {
        &self.tenant
    }

    fn synthesizer(&self) -> ServiceSynthesizer<'_> {
        ServiceSynthesizer::new(&self.service, &self.tenant, self.config)
            .with_event_id(self.event_id.as_deref())
    }

    /// Build every networking resource of the service
    ///
    /// # Errors
    ///
    /// Fails on the first store failure, on an outer port without any routing
    /// rule, and on a missing referenced certificate.
    #[instrument(skip(self), fields(service_id = %self.service.service_id, replication = %self.replication))]
    pub fn build(&self) -> Result<CompiledNetwork, BuildError> {
        let service_id = self.service.service_id.as_str();

        let ports = self
            .store
            .ports(service_id)
            .map_err(|e| BuildError::lookup("ports", service_id, e))?;

        let has_plugin = self
            .store
            .has_upstream_plugin(service_id)
            .map_err(|e| BuildError::lookup("upstream plugin relation", service_id, e))?;

        let (ports, origin_ports) = if has_plugin {
            let mappings = self
                .store
                .plugin_mapping_ports(service_id)
                .map_err(|e| BuildError::lookup("plugin mapping ports", service_id, e))?;
            remap_plugin_ports(ports, &mappings).into_parts()
        } else {
            (ports, None)
        };

        let synthesizer = self.synthesizer();
        let routes =
            RouteCompiler::new(self.store, self.ids, self.config, &self.service, &self.tenant);
        let mut output = CompiledNetwork::new();

        for port in &ports {
            if port.is_inner_service {
                output.services.push(synthesizer.inner(port));
            }
            if port.is_outer_service {
                let outer = synthesizer.outer(port);
                output.push_routes(routes.apply_rules(port, &outer)?);
                output.services.push(outer);
            }
        }

        if self.replication == ReplicationKind::Stateful {
            output.services.push(synthesizer.stateful(&ports));
        }

        if let Some(origin) = &origin_ports {
            label_origin_ports(&mut output.services, origin);
        }

        info!(
            services = output.services.len(),
            ingresses = output.ingresses.len(),
            secrets = output.secrets.len(),
            "built service networking"
        );
        Ok(output)
    }

    /// Build the Service for a single port without touching routing rules
    ///
    /// # Errors
    ///
    /// Returns `PortNotFound` when the service has no such port and
    /// `PortNotExposed` when the port is not exposed in the requested direction.
    #[instrument(skip(self), fields(service_id = %self.service.service_id))]
    pub fn build_on_port(&self, container_port: i32, is_outer: bool) -> Result<Service, BuildError> {
        let service_id = self.service.service_id.as_str();
        let port = self
            .store
            .port(service_id, container_port)
            .map_err(|e| BuildError::lookup("port", format!("{service_id}:{container_port}"), e))?
            .ok_or_else(|| BuildError::PortNotFound {
                service_id: service_id.to_string(),
                container_port,
            })?;

        let synthesizer = self.synthesizer();
        match (is_outer, port.is_outer_service, port.is_inner_service) {
            (true, true, _) => Ok(synthesizer.outer(&port)),
            (false, _, true) => Ok(synthesizer.inner(&port)),
            _ => {
                let direction = if is_outer { "outer" } else { "inner" };
                debug!(container_port, direction, "port not exposed in requested direction");
                Err(BuildError::PortNotExposed {
                    service_id: service_id.to_string(),
                    container_port,
                    direction,
                })
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
