use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::cluster::preset::System;

/// Every way a job configuration can be rejected
///
/// All of these are raised while resolving, before anything is written to disk or submitted.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration has no `cluster` section")]
    MissingCluster,
    #[error("`cluster` section is malformed: {0}")]
    Malformed(#[from] serde_yaml::Error),
    #[error("system `{0}` not recognized, known systems are: {}", System::NAMES.join(", "))]
    UnknownSystem(String),
    #[error("queueing system `{0}` not recognized, expected pbs or slurm")]
    UnknownQueueSystem(String),
    #[error("missing required cluster keys: {}", .0.join(", "))]
    MissingKeys(Vec<&'static str>),
    #[error("`nodes` must be a positive integer, got {0}")]
    InvalidNodes(i64),
    #[error("`{0}` must be at least 1")]
    Zero(&'static str),
    #[error("`{key}` must be an absolute path, got {}", .path.display())]
    RelativeDirectory { key: &'static str, path: PathBuf },
    #[error("virtual environment activation script {} does not exist", .0.display())]
    MissingVenv(PathBuf),
    #[error("can't locate the launcher executable: {0}")]
    LauncherPath(#[source] io::Error),
}
