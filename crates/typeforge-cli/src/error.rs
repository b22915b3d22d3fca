use crate::utils::parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;
use typeforge::core::forcefield::definition::ForcefieldError;
use typeforge::engine::config::ConfigError;
use typeforge::engine::error::ApplyError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error("Forcefield error: {0}")]
    Forcefield(#[from] ForcefieldError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid argument: {0}")]
    Argument(#[from] ParseError),

    #[error("Failed to parse file '{path}': {source}", path = path.display())]
    FileParsing {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
