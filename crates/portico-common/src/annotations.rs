//! Ingress annotation namespacing
//!
//! Routing metadata that the ingress object cannot express natively is carried
//! in annotations. The ingress controller only reads keys under its own prefix,
//! so every bare name goes through [`AnnotationPrefix::key`].

/// Default prefix recognized by the ingress controller
pub const DEFAULT_ANNOTATION_PREFIX: &str = "nginx.ingress.kubernetes.io";

/// Header match spec for HTTP rules
pub const HEADER: &str = "header";
/// Cookie match spec for HTTP rules
pub const COOKIE: &str = "cookie";
/// Forces an HTTP to HTTPS redirect
pub const FORCE_SSL_REDIRECT: &str = "force-ssl-redirect";
/// Load-balancer strategy
pub const LB_TYPE: &str = "lb-type";
/// Marks an ingress as a Layer-4 route
pub const L4_ENABLE: &str = "l4-enable";
/// External IP of a Layer-4 route
pub const L4_HOST: &str = "l4-host";
/// External port of a Layer-4 route
pub const L4_PORT: &str = "l4-port";

/// Namespaces bare annotation names with the ingress controller prefix
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationPrefix {
    prefix: String,
}

impl AnnotationPrefix {
    /// Create a namespacer for the given prefix
    ///
    /// Surrounding whitespace and trailing slashes are ignored.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            prefix: prefix.trim().trim_end_matches('/').to_string(),
        }
    }

    /// The configured prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full annotation key for a bare name
    pub fn key(&self, name: &str) -> String {
        format!("{}/{}", self.prefix, name)
    }
}

impl Default for AnnotationPrefix {
    fn default() -> Self {
        Self::new(DEFAULT_ANNOTATION_PREFIX)
    }
}
