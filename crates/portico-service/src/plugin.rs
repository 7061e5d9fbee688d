//! Upstream plugin port remapping
//!
//! When an upstream network plugin intercepts a service's inbound traffic, the
//! plugin listens on its own port in front of the application. The affected
//! ports are rewritten to point at the plugin, and a reverse map remembers the
//! original container port so outer services can still be labeled with it.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Service;
use kube::ResourceExt;
use tracing::debug;

use portico_common::model::{PluginMappingPort, ServicePort};
use portico_common::{LABEL_ORIGIN_PORT, LABEL_SERVICE_TYPE};

use crate::workload::SERVICE_TYPE_OUTER;

/// Ports after remapping, plus the plugin-port to original-port map
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RemappedPorts {
    /// Ports with plugin substitutions applied
    pub ports: Vec<ServicePort>,
    origin: BTreeMap<i32, i32>,
}

impl RemappedPorts {
    /// Reverse map from plugin port to original container port
    ///
    /// `None` when no port was intercepted.
    pub fn origin_ports(&self) -> Option<&BTreeMap<i32, i32>> {
        if self.origin.is_empty() {
            None
        } else {
            Some(&self.origin)
        }
    }

    /// Split into the ports and the reverse map
    pub fn into_parts(self) -> (Vec<ServicePort>, Option<BTreeMap<i32, i32>>) {
        let origin = if self.origin.is_empty() {
            None
        } else {
            Some(self.origin)
        };
        (self.ports, origin)
    }
}

/// Rewrite ports intercepted by an upstream plugin
///
/// Every port whose container port matches a mapping record gets the plugin
/// port as both container and mapping port. Other ports pass through.
pub fn remap_plugin_ports(
    ports: Vec<ServicePort>,
    mappings: &[PluginMappingPort],
) -> RemappedPorts {
    let mut origin = BTreeMap::new();
    let ports = ports
        .into_iter()
        .map(|mut port| {
            if let Some(mapping) = mappings
                .iter()
                .find(|m| m.container_port == port.container_port)
            {
                debug!(
                    port_id = port.id,
                    container_port = port.container_port,
                    plugin_port = mapping.plugin_port,
                    "port intercepted by upstream plugin"
                );
                origin.insert(mapping.plugin_port, port.container_port);
                port.container_port = mapping.plugin_port;
                port.mapping_port = mapping.plugin_port;
            }
            port
        })
        .collect();

    RemappedPorts { ports, origin }
}

/// Label outer services with the container port their plugin port replaced
///
/// Services are matched on their first port number. Inner and headless
/// services, and outer services whose port was not remapped, are left alone.
pub fn label_origin_ports(services: &mut [Service], origin: &BTreeMap<i32, i32>) {
    for service in services.iter_mut() {
        if service.labels().get(LABEL_SERVICE_TYPE).map(String::as_str) != Some(SERVICE_TYPE_OUTER)
        {
            continue;
        }
        let Some(port) = first_port(service) else {
            continue;
        };
        match origin.get(&port) {
            Some(original) => {
                service
                    .labels_mut()
                    .insert(LABEL_ORIGIN_PORT.to_string(), original.to_string());
            }
            None => debug!(
                service = %service.name_any(),
                port,
                "outer service port was not remapped, skipping origin label"
            ),
        }
    }
}

fn first_port(service: &Service) -> Option<i32> {
    service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|p| p.port)
}
