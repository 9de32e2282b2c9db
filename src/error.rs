use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cluster::ConfigError;

/// Errors that abort a `queue` or `run` invocation
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("can't read configuration {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("configuration {} is not valid YAML: {source}", .path.display())]
    Yaml { path: PathBuf, source: serde_yaml::Error },
    #[error("filesystem error at {}: {source}", .path.display())]
    Filesystem { path: PathBuf, source: io::Error },
    #[error("submission with `{command}` failed: {reason}")]
    Submission { command: String, reason: String },
    #[error("can't start pipeline engine `{program}`: {source}")]
    Engine { program: String, source: io::Error },
}

impl LaunchError {
    pub fn filesystem(path: impl Into<PathBuf>, source: io::Error) -> Self {
        LaunchError::Filesystem { path: path.into(), source }
    }
}
