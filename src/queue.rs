//! Turn a resolved job into a batch script and hand it to the cluster's queueing system

/// Render PBS and SLURM batch scripts with TinyTemplate
pub mod script;

/// Create the job directory and write job files into it
pub mod job;

/// Run `qsub` or `sbatch` against a materialised job
pub mod submit;

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::info;
use serde_yaml::Value;

use crate::cluster::{ConfigError, ResolvedConfig};
use crate::error::LaunchError;
use crate::queue::submit::Submission;

/// Supported queueing systems
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum QueueSystem {
    Pbs,
    Slurm,
}

impl FromStr for QueueSystem {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pbs" => Ok(QueueSystem::Pbs),
            "slurm" => Ok(QueueSystem::Slurm),
            _ => Err(ConfigError::UnknownQueueSystem(s.to_string())),
        }
    }
}

impl fmt::Display for QueueSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            QueueSystem::Pbs => write!(f, "pbs"),
            QueueSystem::Slurm => write!(f, "slurm"),
        }
    }
}

/// Everything that differs between queueing systems: the script template and how to submit it
///
/// Directive syntax, the thread count variable and whether a `RUNNING` state is written all live
/// in the template bodies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Backend {
    pub queue_sys: QueueSystem,
    pub template: &'static str,
    pub submit_command: &'static str,
}

/// included PBS job script template
static PBS_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/pbs.txt"));
/// included SLURM job script template
static SLURM_TEMPLATE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/slurm.txt"));

impl QueueSystem {
    pub fn backend(self) -> Backend {
        match self {
            QueueSystem::Pbs => Backend { queue_sys: self, template: PBS_TEMPLATE, submit_command: "qsub" },
            QueueSystem::Slurm => Backend { queue_sys: self, template: SLURM_TEMPLATE, submit_command: "sbatch" },
        }
    }
}

pub fn select_backend(config: &ResolvedConfig) -> Backend {
    let backend = config.queue_sys.backend();
    info!("Selected {} backend, submitting with {}", backend.queue_sys, backend.submit_command);
    backend
}

/// The `queue` command: resolve, render, materialise and (unless suppressed) submit one job
///
/// Configuration is fully validated before the job directory is touched.
pub fn launch(config_path: &Path, suppress: bool) -> Result<Submission, LaunchError> {
    let raw = read_config(config_path)?;
    let config = ResolvedConfig::resolve(&raw)?;
    info!(
        "Job {}: {} nodes, {} processes, output in {}",
        config.name,
        config.nodes,
        config.mpiproc,
        config.directory.display()
    );
    if let Some(system) = config.system {
        info!("Using {system} cluster preset");
    }
    if config.usetemp {
        info!("Working in {} until the job succeeds", config.temp_directory.display());
    }
    let backend = select_backend(&config);
    let script = script::render(&backend, &config);
    let job = job::materialize(&config, config_path, &script)?;
    submit::submit(&job, &backend, suppress)
}

/// Read a YAML configuration document without interpreting it
pub fn read_config(path: &Path) -> Result<Value, LaunchError> {
    info!("Reading configuration at {}", path.display());
    let text = fs::read_to_string(path).map_err(|source| LaunchError::Read { path: path.to_path_buf(), source })?;
    serde_yaml::from_str(&text).map_err(|source| LaunchError::Yaml { path: path.to_path_buf(), source })
}
