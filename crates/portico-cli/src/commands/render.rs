//! Render command - Print every networking resource of a service

use std::io::Write;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use portico_common::model::ReplicationKind;
use portico_common::{BuildConfig, UuidShortIds};
use portico_service::AppServiceBuild;

use super::{write_manifests, OutputFormat};
use crate::fixtures::FixtureStore;
use crate::Result;

/// Build the Services, Ingresses and Secrets of a service
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Path to the fixture YAML holding the stored records
    #[arg(short = 'f', long)]
    pub fixtures: PathBuf,

    /// Service to build
    #[arg(short = 's', long)]
    pub service_id: String,

    /// Replication kind, overriding the one stored on the service
    #[arg(long)]
    pub replication: Option<ReplicationKind>,

    /// Event id stamped on outer services
    #[arg(long)]
    pub event_id: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Run the render command against stdout
pub fn run(args: RenderArgs, config: &BuildConfig) -> Result<()> {
    let stdout = std::io::stdout();
    render(&args, config, &mut stdout.lock())
}

/// Build the service described by `args` and write its manifests to `out`
pub fn render(args: &RenderArgs, config: &BuildConfig, out: &mut impl Write) -> Result<()> {
    let store = FixtureStore::load(&args.fixtures)?;
    let replication = args
        .replication
        .or_else(|| store.replication_of(&args.service_id))
        .unwrap_or_default();

    let mut build = AppServiceBuild::load(
        &store,
        &UuidShortIds,
        config,
        &args.service_id,
        replication,
    )?;
    if let Some(event_id) = &args.event_id {
        build = build.with_event_id(event_id.as_str());
    }

    let output = build.build()?;
    info!(
        service_id = %args.service_id,
        resources = output.resource_count(),
        "rendered service networking"
    );

    write_manifests(&output.to_manifests()?, args.format, out)
}
