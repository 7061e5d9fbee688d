//! CLI commands

use std::io::Write;

use clap::ValueEnum;

use crate::Result;

pub mod port;
pub mod render;

/// Manifest output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Multi-document YAML
    #[default]
    Yaml,
    /// A pretty-printed `v1/List`
    Json,
}

/// Write manifests to `out` in the requested format
pub fn write_manifests(
    manifests: &[serde_json::Value],
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<()> {
    match format {
        OutputFormat::Yaml => {
            for manifest in manifests {
                writeln!(out, "---")?;
                out.write_all(serde_yaml::to_string(manifest)?.as_bytes())?;
            }
        }
        OutputFormat::Json => {
            let list = serde_json::json!({
                "apiVersion": "v1",
                "kind": "List",
                "items": manifests,
            });
            serde_json::to_writer_pretty(&mut *out, &list)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
