//! Portico CLI
//!
//! Renders the Kubernetes networking resources derived for a tenant service.

use clap::Parser;

use portico_cli::{Cli, Result};
use portico_common::telemetry::init_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format())?;
    cli.run()
}
