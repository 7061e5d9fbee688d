//! Error types for the CLI

use std::path::PathBuf;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("build failed: {0}")]
    Build(#[from] portico_service::BuildError),

    #[error("failed to read fixtures {path}: {source}")]
    Fixtures {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("logging setup failed: {0}")]
    Telemetry(#[from] portico_common::telemetry::TelemetryError),

    #[error("validation error: {message}")]
    Validation { message: String },
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn fixtures(path: impl Into<PathBuf>, source: Error) -> Self {
        Error::Fixtures {
            path: path.into(),
            source: Box::new(source),
        }
    }
}
