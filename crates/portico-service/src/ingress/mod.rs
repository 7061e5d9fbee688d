//! Routing rule application
//!
//! Turns the HTTP and TCP rules stored for an outer port into Ingress objects:
//! - **HTTP rules**: host/path Ingress, header/cookie match annotations,
//!   rule extensions, and a TLS Secret when the rule references a certificate
//! - **TCP rules**: default-backend Ingress marked as Layer-4 through
//!   annotations, since the Ingress object itself only models Layer-7 routing
//!
//! A port may carry both rule types; the resulting Ingresses are additive.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Secret, Service};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use tracing::{debug, warn};

use portico_common::annotations::{
    COOKIE, FORCE_SSL_REDIRECT, HEADER, L4_ENABLE, L4_HOST, L4_PORT, LB_TYPE,
};
use portico_common::model::{
    Certificate, HttpRule, RuleExtension, RuleExtensionKey, ServiceContext, ServicePort,
    TcpRule, TenantContext,
};
use portico_common::{AnnotationPrefix, BuildConfig, IdGenerator};

use crate::error::BuildError;
use crate::store::ServiceStore;

/// Path type used for HTTP ingress paths
pub const PATH_TYPE: &str = "ImplementationSpecific";

/// Secret data key holding the certificate chain
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Secret data key holding the private key
pub const TLS_KEY_KEY: &str = "tls.key";

/// Ingresses and TLS secret generated for one outer port
#[derive(Clone, Debug, Default)]
pub struct GeneratedRoutes {
    /// HTTP and/or TCP ingresses
    pub ingresses: Vec<Ingress>,
    /// TLS secret of the HTTP rule, if it references a certificate
    pub secret: Option<Secret>,
}

impl GeneratedRoutes {
    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.ingresses.is_empty() && self.secret.is_none()
    }
}

/// Remove every whitespace character
fn strip_whitespace(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Normalize a stored path, defaulting to `/`
pub fn normalize_path(raw: &str) -> String {
    let path = strip_whitespace(raw);
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

/// Default domain `{port}.{alias}.{tenant}.{base}` for rules without one
///
/// `None` when no external domain base is configured.
pub fn default_domain(
    base: Option<&str>,
    tenant_name: &str,
    service_alias: &str,
    container_port: i32,
) -> Option<String> {
    base.map(|base| format!("{container_port}.{service_alias}.{tenant_name}.{base}"))
}

/// Build the TLS secret for a certificate
pub fn tls_secret(name: String, namespace: &str, certificate: &Certificate) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([
            (
                TLS_CERT_KEY.to_string(),
                ByteString(certificate.certificate.as_bytes().to_vec()),
            ),
            (
                TLS_KEY_KEY.to_string(),
                ByteString(certificate.private_key.as_bytes().to_vec()),
            ),
        ])),
        ..Default::default()
    }
}

/// Translate rule extensions into annotations
///
/// Unrecognized keys are logged and skipped so newer rule data never blocks
/// an older build.
pub fn extension_annotations(
    annotations: &AnnotationPrefix,
    extensions: &[RuleExtension],
) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for extension in extensions {
        match extension.kind() {
            RuleExtensionKey::HttpToHttps => {
                out.insert(annotations.key(FORCE_SSL_REDIRECT), "true".to_string());
            }
            RuleExtensionKey::LoadBalancerType => {
                out.insert(annotations.key(LB_TYPE), extension.value.clone());
            }
            RuleExtensionKey::Unrecognized(key) => {
                warn!(
                    rule_id = %extension.rule_id,
                    key = %key,
                    value = %extension.value,
                    "ignoring unrecognized rule extension"
                );
            }
        }
    }
    out
}

/// Backend pointing at the outer service's first declared port
fn service_backend(outer: &Service, fallback_port: i32) -> IngressBackend {
    let number = outer
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first())
        .map(|p| p.port)
        .unwrap_or(fallback_port);

    IngressBackend {
        service: Some(IngressServiceBackend {
            name: outer.name_any(),
            port: Some(ServiceBackendPort {
                number: Some(number),
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

// =============================================================================
// Route Compiler
// =============================================================================

/// Applies the routing rules of outer ports for one tenant service
pub struct RouteCompiler<'a> {
    store: &'a dyn ServiceStore,
    ids: &'a dyn IdGenerator,
    config: &'a BuildConfig,
    service: &'a ServiceContext,
    tenant: &'a TenantContext,
}

impl<'a> RouteCompiler<'a> {
    /// Create a route compiler for a service in a tenant
    pub fn new(
        store: &'a dyn ServiceStore,
        ids: &'a dyn IdGenerator,
        config: &'a BuildConfig,
        service: &'a ServiceContext,
        tenant: &'a TenantContext,
    ) -> Self {
        Self {
            store,
            ids,
            config,
            service,
            tenant,
        }
    }

    /// Resolve and apply the rules bound to an outer port
    ///
    /// A failing rule lookup is logged and treated as "no rule". The port must
    /// end up with at least one rule.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::NoRoutingRule` if neither an HTTP nor a TCP rule
    /// exists, and propagates certificate and extension lookup failures.
    pub fn apply_rules(
        &self,
        port: &ServicePort,
        outer: &Service,
    ) -> Result<GeneratedRoutes, BuildError> {
        let service_id = &port.service_id;
        let http_rule = self
            .store
            .http_rule(service_id, port.container_port)
            .unwrap_or_else(|e| {
                warn!(service_id = %service_id, port = port.container_port, error = %e, "HTTP rule lookup failed");
                None
            });
        let tcp_rule = self
            .store
            .tcp_rule(service_id, port.container_port)
            .unwrap_or_else(|e| {
                warn!(service_id = %service_id, port = port.container_port, error = %e, "TCP rule lookup failed");
                None
            });

        if http_rule.is_none() && tcp_rule.is_none() {
            return Err(BuildError::NoRoutingRule {
                service_id: service_id.clone(),
                container_port: port.container_port,
            });
        }

        let mut routes = GeneratedRoutes::default();

        if let Some(rule) = http_rule {
            let (ingress, secret) = self.apply_http_rule(&rule, port, outer)?;
            routes.ingresses.push(ingress);
            routes.secret = secret;
        }

        if let Some(rule) = tcp_rule {
            routes.ingresses.push(self.apply_tcp_rule(&rule, port, outer));
        }

        Ok(routes)
    }

    /// Build the Ingress (and optional TLS Secret) for an HTTP rule
    pub fn apply_http_rule(
        &self,
        rule: &HttpRule,
        port: &ServicePort,
        outer: &Service,
    ) -> Result<(Ingress, Option<Secret>), BuildError> {
        let path = normalize_path(&rule.path);
        let domain = Some(strip_whitespace(&rule.domain))
            .filter(|d| !d.is_empty())
            .or_else(|| {
                default_domain(
                    self.config.external_domain_base().as_deref(),
                    &self.tenant.name,
                    &self.service.service_alias,
                    port.container_port,
                )
            });
        if domain.is_none() {
            debug!(
                rule_id = %rule.rule_id,
                "no domain and no external domain base configured, route has no host"
            );
        }
        let name_base = domain.clone().unwrap_or_else(|| outer.name_any());
        let namespace = &self.tenant.tenant_id;

        let mut annotations = BTreeMap::new();
        if !rule.header.is_empty() {
            annotations.insert(self.config.annotations.key(HEADER), rule.header.clone());
        }
        if !rule.cookie.is_empty() {
            annotations.insert(self.config.annotations.key(COOKIE), rule.cookie.clone());
        }

        let mut tls = None;
        let mut secret = None;
        if let Some(certificate_id) = rule.certificate_ref() {
            let certificate = self
                .store
                .certificate(certificate_id)
                .map_err(|e| BuildError::lookup("certificate", certificate_id, e))?
                .ok_or_else(|| BuildError::CertificateNotFound {
                    rule_id: rule.rule_id.clone(),
                    certificate_id: certificate_id.to_string(),
                })?;

            let tls_secret = tls_secret(format!("certificate-{name_base}"), namespace, &certificate);
            tls = Some(vec![IngressTLS {
                hosts: domain.clone().map(|d| vec![d]),
                secret_name: tls_secret.metadata.name.clone(),
            }]);
            secret = Some(tls_secret);
        }

        let extensions = self
            .store
            .rule_extensions(&rule.rule_id)
            .map_err(|e| BuildError::lookup("rule extensions", &rule.rule_id, e))?;
        annotations.extend(extension_annotations(&self.config.annotations, &extensions));

        let ingress = Ingress {
            metadata: ObjectMeta {
                name: Some(format!("ing-{}-{}", name_base, self.ids.short_id())),
                namespace: Some(namespace.clone()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                rules: Some(vec![IngressRule {
                    host: domain,
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some(path),
                            path_type: PATH_TYPE.to_string(),
                            backend: service_backend(outer, port.visible_port()),
                        }],
                    }),
                }]),
                tls,
                ..Default::default()
            }),
            ..Default::default()
        };

        Ok((ingress, secret))
    }

    /// Build the Layer-4 Ingress for a TCP rule
    pub fn apply_tcp_rule(&self, rule: &TcpRule, port: &ServicePort, outer: &Service) -> Ingress {
        let annotations = BTreeMap::from([
            (self.config.annotations.key(L4_ENABLE), "true".to_string()),
            (self.config.annotations.key(L4_HOST), rule.ip.clone()),
            (self.config.annotations.key(L4_PORT), rule.port.to_string()),
        ]);

        Ingress {
            metadata: ObjectMeta {
                name: Some(format!("ing-{}-{}", rule.ip, self.ids.short_id())),
                namespace: Some(self.tenant.tenant_id.clone()),
                annotations: Some(annotations),
                ..Default::default()
            },
            spec: Some(IngressSpec {
                default_backend: Some(service_backend(outer, port.visible_port())),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockServiceStore;
    use crate::workload::ServiceSynthesizer;
    use portico_common::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SequentialIds(AtomicUsize);

    impl SequentialIds {
        fn new() -> Self {
            Self(AtomicUsize::new(0))
        }
    }

    impl IdGenerator for SequentialIds {
        fn short_id(&self) -> String {
            format!("id{:06}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    fn make_service() -> ServiceContext {
        ServiceContext {
            service_id: "svc-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            service_alias: "web".to_string(),
            service_name: "web".to_string(),
            deploy_version: "1".to_string(),
            replicas: 2,
            ..Default::default()
        }
    }

    fn make_tenant() -> TenantContext {
        TenantContext {
            tenant_id: "tenant-1".to_string(),
            name: "acme".to_string(),
        }
    }

    fn make_port() -> ServicePort {
        ServicePort {
            id: 1,
            service_id: "svc-1".to_string(),
            container_port: 8080,
            mapping_port: 0,
            protocol: "http".to_string(),
            is_inner_service: false,
            is_outer_service: true,
        }
    }

    fn make_http_rule() -> HttpRule {
        HttpRule {
            rule_id: "rule-1".to_string(),
            service_id: "svc-1".to_string(),
            container_port: 8080,
            domain: "www.example.org".to_string(),
            path: "/api".to_string(),
            ..Default::default()
        }
    }

    fn make_cert() -> Certificate {
        Certificate {
            certificate_id: "cert-1".to_string(),
            certificate_name: "www".to_string(),
            certificate: "CERT PEM".to_string(),
            private_key: "KEY PEM".to_string(),
        }
    }

    fn outer_for(service: &ServiceContext, tenant: &TenantContext, config: &BuildConfig) -> Service {
        ServiceSynthesizer::new(service, tenant, config).outer(&make_port())
    }

    fn store_with_rules(http: Option<HttpRule>, tcp: Option<TcpRule>) -> MockServiceStore {
        let mut store = MockServiceStore::new();
        store
            .expect_http_rule()
            .returning(move |_, _| Ok(http.clone()));
        store.expect_tcp_rule().returning(move |_, _| Ok(tcp.clone()));
        store.expect_rule_extensions().returning(|_| Ok(vec![]));
        store
    }

    fn annotations_of(ingress: &Ingress) -> &BTreeMap<String, String> {
        ingress.metadata.annotations.as_ref().expect("annotations")
    }

    fn first_rule(ingress: &Ingress) -> &IngressRule {
        &ingress
            .spec
            .as_ref()
            .and_then(|s| s.rules.as_ref())
            .expect("rules")[0]
    }

    // =========================================================================
    // Pure helpers
    // =========================================================================

    #[test]
    fn blank_path_defaults_to_root() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("   "), "/");
        assert_eq!(normalize_path(" /api /v1 "), "/api/v1");
    }

    #[test]
    fn default_domain_template() {
        assert_eq!(
            default_domain(Some("example.com"), "acme", "web", 8080).as_deref(),
            Some("8080.web.acme.example.com")
        );
        assert_eq!(default_domain(None, "acme", "web", 8080), None);
    }

    #[test]
    fn extension_translation() {
        let prefix = AnnotationPrefix::default();
        let ext = |key: &str, value: &str| RuleExtension {
            rule_id: "rule-1".to_string(),
            key: key.to_string(),
            value: value.to_string(),
        };
        let out = extension_annotations(
            &prefix,
            &[
                ext("httptohttps", ""),
                ext("lb-type", "round-robin"),
                ext("future-key", "x"),
            ],
        );

        assert_eq!(out.len(), 2);
        assert_eq!(
            out.get("nginx.ingress.kubernetes.io/force-ssl-redirect"),
            Some(&"true".to_string())
        );
        assert_eq!(
            out.get("nginx.ingress.kubernetes.io/lb-type"),
            Some(&"round-robin".to_string())
        );
    }

    // =========================================================================
    // Rule resolution
    // =========================================================================

    #[test]
    fn missing_rules_fail_the_port() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let store = store_with_rules(None, None);
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let err = compiler
            .apply_rules(&make_port(), &outer_for(&service, &tenant, &config))
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::NoRoutingRule {
                container_port: 8080,
                ..
            }
        ));
    }

    #[test]
    fn rule_lookup_failure_counts_as_absent() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut store = MockServiceStore::new();
        store
            .expect_http_rule()
            .returning(|_, _| Err(StoreError::backend("timeout")));
        store.expect_tcp_rule().returning(|_, _| {
            Ok(Some(TcpRule {
                rule_id: "tcp-1".to_string(),
                service_id: "svc-1".to_string(),
                container_port: 8080,
                ip: "10.0.0.5".to_string(),
                port: 30080,
            }))
        });
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let routes = compiler
            .apply_rules(&make_port(), &outer_for(&service, &tenant, &config))
            .unwrap();
        assert_eq!(routes.ingresses.len(), 1);
        assert!(routes.secret.is_none());
    }

    #[test]
    fn http_and_tcp_rules_are_additive() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let tcp = TcpRule {
            rule_id: "tcp-1".to_string(),
            service_id: "svc-1".to_string(),
            container_port: 8080,
            ip: "0.0.0.0".to_string(),
            port: 30080,
        };
        let store = store_with_rules(Some(make_http_rule()), Some(tcp));
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let routes = compiler
            .apply_rules(&make_port(), &outer_for(&service, &tenant, &config))
            .unwrap();
        assert_eq!(routes.ingresses.len(), 2);
        assert!(routes.ingresses[0]
            .name_any()
            .starts_with("ing-www.example.org-"));
        assert!(routes.ingresses[1].name_any().starts_with("ing-0.0.0.0-"));
    }

    // =========================================================================
    // HTTP rules
    // =========================================================================

    #[test]
    fn http_route_targets_outer_service_port() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let store = store_with_rules(Some(make_http_rule()), None);
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);
        let outer = outer_for(&service, &tenant, &config);

        let (ingress, secret) = compiler
            .apply_http_rule(&make_http_rule(), &make_port(), &outer)
            .unwrap();
        assert!(secret.is_none());
        assert_eq!(ingress.name_any(), "ing-www.example.org-id000000");
        assert_eq!(ingress.namespace().as_deref(), Some("tenant-1"));

        let rule = first_rule(&ingress);
        assert_eq!(rule.host.as_deref(), Some("www.example.org"));
        let path = &rule.http.as_ref().expect("http").paths[0];
        assert_eq!(path.path.as_deref(), Some("/api"));
        assert_eq!(path.path_type, PATH_TYPE);
        let backend = path.backend.service.as_ref().expect("service backend");
        assert_eq!(backend.name, "service-1-8080out");
        assert_eq!(backend.port.as_ref().and_then(|p| p.number), Some(8080));
    }

    #[test]
    fn repeated_builds_never_reuse_route_names() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let store = store_with_rules(Some(make_http_rule()), None);
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);
        let outer = outer_for(&service, &tenant, &config);

        let (first, _) = compiler
            .apply_http_rule(&make_http_rule(), &make_port(), &outer)
            .unwrap();
        let (second, _) = compiler
            .apply_http_rule(&make_http_rule(), &make_port(), &outer)
            .unwrap();
        assert_ne!(first.name_any(), second.name_any());
    }

    #[test]
    fn empty_domain_uses_default_domain() {
        let (service, tenant) = (make_service(), make_tenant());
        let config = BuildConfig::with_external_domain(".example.com");
        let mut rule = make_http_rule();
        rule.domain = "  ".to_string();
        rule.path = String::new();
        let store = store_with_rules(Some(rule.clone()), None);
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let (ingress, _) = compiler
            .apply_http_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config))
            .unwrap();
        let ingress_rule = first_rule(&ingress);
        assert_eq!(
            ingress_rule.host.as_deref(),
            Some("8080.web.acme.example.com")
        );
        assert_eq!(
            ingress_rule.http.as_ref().expect("http").paths[0]
                .path
                .as_deref(),
            Some("/")
        );
    }

    #[test]
    fn no_domain_and_no_base_leaves_host_unset() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut rule = make_http_rule();
        rule.domain = String::new();
        let store = store_with_rules(Some(rule.clone()), None);
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let (ingress, _) = compiler
            .apply_http_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config))
            .unwrap();
        assert!(first_rule(&ingress).host.is_none());
        assert!(ingress.name_any().starts_with("ing-service-1-8080out-"));
    }

    #[test]
    fn header_and_cookie_annotations_only_when_set() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let store = store_with_rules(None, None);
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);
        let outer = outer_for(&service, &tenant, &config);

        let (plain, _) = compiler
            .apply_http_rule(&make_http_rule(), &make_port(), &outer)
            .unwrap();
        assert!(annotations_of(&plain).is_empty());

        let mut rule = make_http_rule();
        rule.header = "X-Canary:always".to_string();
        rule.cookie = "beta=1".to_string();
        let (matched, _) = compiler
            .apply_http_rule(&rule, &make_port(), &outer)
            .unwrap();
        let annotations = annotations_of(&matched);
        assert_eq!(
            annotations.get("nginx.ingress.kubernetes.io/header"),
            Some(&"X-Canary:always".to_string())
        );
        assert_eq!(
            annotations.get("nginx.ingress.kubernetes.io/cookie"),
            Some(&"beta=1".to_string())
        );
    }

    #[test]
    fn certificate_reference_yields_one_tls_secret() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut rule = make_http_rule();
        rule.certificate_id = Some("cert-1".to_string());
        let mut store = store_with_rules(None, None);
        store
            .expect_certificate()
            .withf(|id| id == "cert-1")
            .times(1)
            .returning(|_| Ok(Some(make_cert())));
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let (ingress, secret) = compiler
            .apply_http_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config))
            .unwrap();
        let secret = secret.expect("certificate should produce a secret");
        assert_eq!(secret.name_any(), "certificate-www.example.org");
        assert_eq!(secret.type_.as_deref(), Some("Opaque"));
        let data = secret.data.as_ref().expect("data");
        assert_eq!(data.get(TLS_CERT_KEY), Some(&ByteString(b"CERT PEM".to_vec())));
        assert_eq!(data.get(TLS_KEY_KEY), Some(&ByteString(b"KEY PEM".to_vec())));

        let tls = &ingress
            .spec
            .as_ref()
            .and_then(|s| s.tls.as_ref())
            .expect("tls")[0];
        assert_eq!(
            tls.hosts.as_deref(),
            Some(&["www.example.org".to_string()][..])
        );
        assert_eq!(
            tls.secret_name.as_deref(),
            Some("certificate-www.example.org")
        );
    }

    #[test]
    fn empty_certificate_reference_yields_no_secret() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut rule = make_http_rule();
        rule.certificate_id = Some(String::new());
        let mut store = store_with_rules(None, None);
        store.expect_certificate().never();
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let (ingress, secret) = compiler
            .apply_http_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config))
            .unwrap();
        assert!(secret.is_none());
        assert!(ingress.spec.as_ref().and_then(|s| s.tls.as_ref()).is_none());
    }

    #[test]
    fn missing_certificate_is_fatal() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut rule = make_http_rule();
        rule.certificate_id = Some("cert-404".to_string());
        let mut store = store_with_rules(None, None);
        store.expect_certificate().returning(|_| Ok(None));
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let err = compiler
            .apply_http_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(matches!(
            err,
            BuildError::CertificateNotFound { ref certificate_id, .. } if certificate_id == "cert-404"
        ));
    }

    #[test]
    fn certificate_lookup_failure_is_fatal() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut rule = make_http_rule();
        rule.certificate_id = Some("cert-1".to_string());
        let mut store = store_with_rules(None, None);
        store
            .expect_certificate()
            .returning(|_| Err(StoreError::backend("db down")));
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let err = compiler
            .apply_http_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config))
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn extensions_become_annotations() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut store = MockServiceStore::new();
        store
            .expect_rule_extensions()
            .withf(|id| id == "rule-1")
            .returning(|_| {
                Ok(vec![
                    RuleExtension {
                        rule_id: "rule-1".to_string(),
                        key: "httptohttps".to_string(),
                        value: String::new(),
                    },
                    RuleExtension {
                        rule_id: "rule-1".to_string(),
                        key: "something-new".to_string(),
                        value: "ignored".to_string(),
                    },
                ])
            });
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let (ingress, _) = compiler
            .apply_http_rule(
                &make_http_rule(),
                &make_port(),
                &outer_for(&service, &tenant, &config),
            )
            .unwrap();
        let annotations = annotations_of(&ingress);
        assert_eq!(annotations.len(), 1);
        assert_eq!(
            annotations.get("nginx.ingress.kubernetes.io/force-ssl-redirect"),
            Some(&"true".to_string())
        );
    }

    #[test]
    fn extension_lookup_failure_is_fatal() {
        let (service, tenant, config) = (make_service(), make_tenant(), BuildConfig::default());
        let mut store = MockServiceStore::new();
        store
            .expect_rule_extensions()
            .returning(|_| Err(StoreError::backend("db down")));
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);

        let err = compiler
            .apply_http_rule(
                &make_http_rule(),
                &make_port(),
                &outer_for(&service, &tenant, &config),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Lookup {
                lookup: "rule extensions",
                ..
            }
        ));
    }

    // =========================================================================
    // TCP rules
    // =========================================================================

    #[test]
    fn tcp_route_is_layer4_default_backend() {
        let (service, tenant) = (make_service(), make_tenant());
        let config = BuildConfig {
            annotations: AnnotationPrefix::new("gw.example.io"),
            ..Default::default()
        };
        let store = MockServiceStore::new();
        let ids = SequentialIds::new();
        let compiler = RouteCompiler::new(&store, &ids, &config, &service, &tenant);
        let rule = TcpRule {
            rule_id: "tcp-1".to_string(),
            service_id: "svc-1".to_string(),
            container_port: 8080,
            ip: "192.168.1.10".to_string(),
            port: 31000,
        };

        let ingress =
            compiler.apply_tcp_rule(&rule, &make_port(), &outer_for(&service, &tenant, &config));
        assert_eq!(ingress.name_any(), "ing-192.168.1.10-id000000");

        let spec = ingress.spec.as_ref().expect("spec");
        assert!(spec.rules.is_none());
        let backend = spec
            .default_backend
            .as_ref()
            .and_then(|b| b.service.as_ref())
            .expect("default backend");
        assert_eq!(backend.name, "service-1-8080out");
        assert_eq!(backend.port.as_ref().and_then(|p| p.number), Some(8080));

        let annotations = annotations_of(&ingress);
        assert_eq!(
            annotations.get("gw.example.io/l4-enable"),
            Some(&"true".to_string())
        );
        assert_eq!(
            annotations.get("gw.example.io/l4-host"),
            Some(&"192.168.1.10".to_string())
        );
        assert_eq!(
            annotations.get("gw.example.io/l4-port"),
            Some(&"31000".to_string())
        );
    }
}
