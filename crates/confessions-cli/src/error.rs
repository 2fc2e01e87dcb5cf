use std::io;

use thiserror::Error;

use crate::config_profiles::ProfileFileError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] confessions_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Profiles(#[from] ProfileFileError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No confession text provided")]
    EmptyContent,
    #[error("Invalid confession ID: {0}")]
    InvalidConfessionId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
}
