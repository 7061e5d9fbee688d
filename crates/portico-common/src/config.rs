//! Build configuration
//!
//! Environment-level settings that influence the generated objects. A
//! [`BuildConfig`] is constructed once (usually from the process environment
//! at startup) and passed into every build explicitly.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::annotations::AnnotationPrefix;

/// Environment variable holding the external domain base for default domains
pub const ENV_EXTERNAL_DOMAIN: &str = "EX_DOMAIN";

/// Environment variable selecting the cluster network mode
pub const ENV_NETWORK_MODE: &str = "CUR_NET";

/// Environment variable overriding the ingress annotation prefix
pub const ENV_ANNOTATION_PREFIX: &str = "PORTICO_ANNOTATION_PREFIX";

/// Cluster network mode
///
/// Decides how externally exposed services are published.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    /// Outer services are cluster-internal and reached through ingress
    #[default]
    Standard,
    /// Midonet networking: outer services are exposed on every node
    Midonet,
}

impl NetworkMode {
    /// Kubernetes service type used for outer services in this mode
    pub fn outer_service_type(&self) -> &'static str {
        match self {
            Self::Standard => "ClusterIP",
            Self::Midonet => "NodePort",
        }
    }
}

impl From<&str> for NetworkMode {
    /// Only `midonet` selects node-exposed services; anything else is standard
    fn from(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("midonet") {
            Self::Midonet
        } else {
            Self::Standard
        }
    }
}

impl std::fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Midonet => write!(f, "midonet"),
        }
    }
}

/// Configuration shared by every build in a process
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Raw external domain base (e.g. `.apps.example.com:443`)
    pub external_domain: Option<String>,
    /// Network mode of the target cluster
    pub network_mode: NetworkMode,
    /// Prefix applied to ingress annotations
    pub annotations: AnnotationPrefix,
}

impl BuildConfig {
    /// Create a config with the given external domain and defaults elsewhere
    pub fn with_external_domain(domain: impl Into<String>) -> Self {
        Self {
            external_domain: Some(domain.into()),
            ..Default::default()
        }
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        let external_domain = std::env::var(ENV_EXTERNAL_DOMAIN)
            .ok()
            .filter(|v| !v.trim().is_empty());
        let network_mode = std::env::var(ENV_NETWORK_MODE)
            .map(|v| NetworkMode::from(v.as_str()))
            .unwrap_or_default();
        let annotations = std::env::var(ENV_ANNOTATION_PREFIX)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(AnnotationPrefix::new)
            .unwrap_or_default();

        debug!(
            external_domain = external_domain.as_deref().unwrap_or(""),
            network_mode = %network_mode,
            annotation_prefix = annotations.prefix(),
            "build configuration loaded from environment"
        );

        Self {
            external_domain,
            network_mode,
            annotations,
        }
    }

    /// External domain base normalized for default-domain synthesis
    ///
    /// Any `:port` suffix and a single leading dot are removed. Returns `None`
    /// when no usable base is configured.
    pub fn external_domain_base(&self) -> Option<String> {
        let raw = self.external_domain.as_deref()?.trim();
        let host = raw.split(':').next().unwrap_or(raw);
        let host = host.strip_prefix('.').unwrap_or(host).trim();
        if host.is_empty() {
            None
        } else {
            Some(host.to_string())
        }
    }
}
