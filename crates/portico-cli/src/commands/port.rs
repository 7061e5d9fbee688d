//! Port command - Print the Service of a single port

use std::io::Write;
use std::path::PathBuf;

use clap::Args;

use portico_common::{BuildConfig, UuidShortIds};
use portico_service::AppServiceBuild;

use super::{write_manifests, OutputFormat};
use crate::fixtures::FixtureStore;
use crate::Result;

/// Build the inner or outer Service of one port
#[derive(Args, Debug)]
pub struct PortArgs {
    /// Path to the fixture YAML holding the stored records
    #[arg(short = 'f', long)]
    pub fixtures: PathBuf,

    /// Service owning the port
    #[arg(short = 's', long)]
    pub service_id: String,

    /// Container port
    #[arg(short = 'p', long)]
    pub port: i32,

    /// Build the outer Service instead of the inner one
    #[arg(long)]
    pub outer: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Run the port command against stdout
pub fn run(args: PortArgs, config: &BuildConfig) -> Result<()> {
    let stdout = std::io::stdout();
    render_port(&args, config, &mut stdout.lock())
}

/// Build the requested port's Service and write it to `out`
pub fn render_port(args: &PortArgs, config: &BuildConfig, out: &mut impl Write) -> Result<()> {
    let store = FixtureStore::load(&args.fixtures)?;
    let replication = store.replication_of(&args.service_id).unwrap_or_default();

    let build = AppServiceBuild::load(
        &store,
        &UuidShortIds,
        config,
        &args.service_id,
        replication,
    )?;
    let service = build.build_on_port(args.port, args.outer)?;

    write_manifests(&[serde_json::to_value(&service)?], args.format, out)
}
