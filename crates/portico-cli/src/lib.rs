//! Portico CLI library

pub mod commands;
pub mod error;
pub mod fixtures;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

use portico_common::telemetry::LogFormat;
use portico_common::{AnnotationPrefix, BuildConfig, NetworkMode};

/// Portico - Render the networking resources of tenant services
#[derive(Parser, Debug)]
#[command(name = "portico")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// External domain base for default HTTP domains (e.g. `.apps.example.com:443`)
    #[arg(long, global = true, env = "EX_DOMAIN")]
    pub external_domain: Option<String>,

    /// Cluster network mode; `midonet` exposes outer services as NodePort
    #[arg(long, global = true, env = "CUR_NET")]
    pub network_mode: Option<String>,

    /// Prefix for ingress controller annotations
    #[arg(long, global = true, env = "PORTICO_ANNOTATION_PREFIX")]
    pub annotation_prefix: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render every Service, Ingress and Secret of a service
    Render(commands::render::RenderArgs),
    /// Render the inner or outer Service of one port
    Port(commands::port::PortArgs),
}

impl Cli {
    /// Build configuration assembled from global flags and their env fallbacks
    pub fn build_config(&self) -> BuildConfig {
        BuildConfig {
            external_domain: self
                .external_domain
                .clone()
                .filter(|d| !d.trim().is_empty()),
            network_mode: self
                .network_mode
                .as_deref()
                .map(NetworkMode::from)
                .unwrap_or_default(),
            annotations: self
                .annotation_prefix
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(AnnotationPrefix::new)
                .unwrap_or_default(),
        }
    }

    /// Log format selected by `--log-json`
    pub fn log_format(&self) -> LogFormat {
        if self.log_json {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }

    /// Run the CLI command
    pub fn run(self) -> Result<()> {
        let config = self.build_config();
        match self.command {
            Commands::Render(args) => commands::render::run(args, &config),
            Commands::Port(args) => commands::port::run(args, &config),
        }
    }
}
