//! Service synthesis
//!
//! Builds the three Service variants for a tenant service:
//! - **Inner**: one per inner-exposed port, reachable inside the cluster
//! - **Outer**: one per outer-exposed port, the backend for ingress routes
//! - **Stateful**: one headless Service covering every port
//!
//! Everything here is pure; the caller resolves context and ports first.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Service, ServicePort as K8sServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use portico_common::model::{ServiceContext, ServicePort, TenantContext};
use portico_common::{
    BuildConfig, ALPHA_TOLERATE_UNREADY_ENDPOINTS, LABEL_CREATOR, LABEL_CREATOR_PORTICO,
    LABEL_NAME, LABEL_SERVICE_ALIAS, LABEL_SERVICE_ID, LABEL_SERVICE_TYPE, LABEL_TENANT_ID,
    TOLERATE_UNREADY_ENDPOINTS,
};

/// `service_type` label value of inner services
pub const SERVICE_TYPE_INNER: &str = "inner";
/// `service_type` label value of outer services
pub const SERVICE_TYPE_OUTER: &str = "outer";
/// `service_type` label value of headless services
pub const SERVICE_TYPE_STATEFUL: &str = "stateful";

/// Name of the inner service for a port
///
/// Depends only on the port's id and container port, so re-synthesis yields
/// the same name.
pub fn inner_service_name(port: &ServicePort) -> String {
    format!("service-{}-{}", port.id, port.container_port)
}

/// Name of the outer service for a port
pub fn outer_service_name(port: &ServicePort) -> String {
    format!("service-{}-{}out", port.id, port.container_port)
}

/// Synthesizes Services for one tenant service
pub struct ServiceSynthesizer<'a> {
    service: &'a ServiceContext,
    tenant: &'a TenantContext,
    config: &'a BuildConfig,
    event_id: Option<&'a str>,
}

impl<'a> ServiceSynthesizer<'a> {
    /// Create a synthesizer for a service in a tenant
    pub fn new(
        service: &'a ServiceContext,
        tenant: &'a TenantContext,
        config: &'a BuildConfig,
    ) -> Self {
        Self {
            service,
            tenant,
            config,
            event_id: None,
        }
    }

    /// Stamp outer services with the event that triggered the build
    pub fn with_event_id(mut self, event_id: Option<&'a str>) -> Self {
        self.event_id = event_id;
        self
    }

    /// Inner service for one inner-exposed port
    pub fn inner(&self, port: &ServicePort) -> Service {
        let mut labels = self.common_labels();
        labels.insert(
            LABEL_SERVICE_TYPE.to_string(),
            SERVICE_TYPE_INNER.to_string(),
        );
        labels.insert(
            LABEL_NAME.to_string(),
            format!("{}Service", self.service.service_alias),
        );
        labels.insert("port_protocol".to_string(), port.protocol.clone());
        labels.insert(
            "version".to_string(),
            self.service.deploy_version.clone(),
        );

        let mut annotations = BTreeMap::new();
        if self.tolerates_unready() {
            labels.insert(TOLERATE_UNREADY_ENDPOINTS.to_string(), "true".to_string());
            annotations.insert(TOLERATE_UNREADY_ENDPOINTS.to_string(), "true".to_string());
        }

        Service {
            metadata: self.metadata(inner_service_name(port), labels, annotations),
            spec: Some(ServiceSpec {
                ports: Some(vec![Self::service_port(port, None)]),
                selector: Some(self.selector()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Outer service for one outer-exposed port
    ///
    /// Ingress routes for the port point at this service.
    pub fn outer(&self, port: &ServicePort) -> Service {
        let mut labels = self.common_labels();
        labels.insert(
            LABEL_SERVICE_TYPE.to_string(),
            SERVICE_TYPE_OUTER.to_string(),
        );
        labels.insert(
            LABEL_NAME.to_string(),
            format!("{}ServiceOUT", self.service.service_alias),
        );
        labels.insert("tenant_name".to_string(), self.tenant.name.clone());
        labels.insert("protocol".to_string(), port.protocol.clone());
        labels.insert("port_protocol".to_string(), port.protocol.clone());
        labels.insert(
            "version".to_string(),
            self.service.deploy_version.clone(),
        );
        if let Some(event_id) = self.event_id {
            labels.insert("event_id".to_string(), event_id.to_string());
        }
        if self.tolerates_unready() {
            labels.insert(TOLERATE_UNREADY_ENDPOINTS.to_string(), "true".to_string());
        }

        Service {
            metadata: self.metadata(outer_service_name(port), labels, BTreeMap::new()),
            spec: Some(ServiceSpec {
                ports: Some(vec![Self::service_port(port, None)]),
                selector: Some(self.selector()),
                type_: Some(self.config.network_mode.outer_service_type().to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Headless service covering every port of a stateful service
    ///
    /// Replicas must be addressable before they are ready so peers can find
    /// each other during ordered startup.
    pub fn stateful(&self, ports: &[ServicePort]) -> Service {
        let mut labels = BTreeMap::new();
        labels.insert(
            LABEL_SERVICE_TYPE.to_string(),
            SERVICE_TYPE_STATEFUL.to_string(),
        );
        labels.insert(
            LABEL_NAME.to_string(),
            format!("{}ServiceStateful", self.service.service_alias),
        );
        labels.insert(
            LABEL_CREATOR.to_string(),
            LABEL_CREATOR_PORTICO.to_string(),
        );
        labels.insert(
            LABEL_SERVICE_ID.to_string(),
            self.service.service_id.clone(),
        );

        let annotations = BTreeMap::from([(
            ALPHA_TOLERATE_UNREADY_ENDPOINTS.to_string(),
            "true".to_string(),
        )]);

        let service_ports = ports
            .iter()
            .map(|p| Self::service_port(p, Some(format!("{}-port", p.id))))
            .collect();

        Service {
            metadata: self.metadata(self.service.service_name.clone(), labels, annotations),
            spec: Some(ServiceSpec {
                ports: Some(service_ports),
                selector: Some(self.selector()),
                cluster_ip: Some("None".to_string()),
                publish_not_ready_addresses: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn service_port(port: &ServicePort, name: Option<String>) -> K8sServicePort {
        K8sServicePort {
            name,
            port: port.visible_port(),
            target_port: Some(IntOrString::Int(port.container_port)),
            protocol: Some(port.k8s_protocol().to_string()),
            ..Default::default()
        }
    }

    fn tolerates_unready(&self) -> bool {
        self.service.replicas <= 1
    }

    fn selector(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(
            LABEL_NAME.to_string(),
            self.service.service_alias.clone(),
        )])
    }

    fn common_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                LABEL_CREATOR.to_string(),
                LABEL_CREATOR_PORTICO.to_string(),
            ),
            (
                LABEL_SERVICE_ID.to_string(),
                self.service.service_id.clone(),
            ),
            (LABEL_TENANT_ID.to_string(), self.tenant.tenant_id.clone()),
            (
                LABEL_SERVICE_ALIAS.to_string(),
                self.service.service_alias.clone(),
            ),
        ])
    }

    fn metadata(
        &self,
        name: String,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
    ) -> ObjectMeta {
        ObjectMeta {
            name: Some(name),
            namespace: Some(self.tenant.tenant_id.clone()),
            labels: Some(labels),
            annotations: if annotations.is_empty() {
                None
            } else {
                Some(annotations)
            },
            ..Default::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
