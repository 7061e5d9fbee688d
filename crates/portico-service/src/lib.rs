//! Network resource projection for Portico tenant services
//!
//! This crate turns the stored definition of a tenant service into the
//! Kubernetes networking objects that expose it:
//!
//! - **Plugin**: rewrites ports intercepted by an upstream network plugin
//! - **Workload**: synthesizes inner, outer and headless Services
//! - **Ingress**: applies HTTP/TCP routing rules as Ingresses and TLS Secrets
//! - **Compiler**: `AppServiceBuild`, which drives the above for one service

pub mod compiler;
pub mod error;
pub mod ingress;
pub mod plugin;
pub mod store;
pub mod workload;

pub use compiler::{AppServiceBuild, CompiledNetwork};
pub use error::BuildError;
pub use store::ServiceStore;
