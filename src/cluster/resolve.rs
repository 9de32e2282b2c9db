use std::env;
use std::path::PathBuf;

use log::{debug, info};
use serde_yaml::Value;

use crate::cluster::preset::{defaults, System};
use crate::cluster::section::ClusterSection;
use crate::cluster::ConfigError;
use crate::path::{expand_path, fix_path};
use crate::queue::QueueSystem;

/// Job files live in this subdirectory of the working directory
pub const JOB_SUBDIR: &str = "job";
pub const CONFIG_NAME: &str = "config.yaml";
pub const SCRIPT_NAME: &str = "jobscript.sh";
pub const LOG_NAME: &str = "jobout.log";
pub const STATUS_NAME: &str = "STATUS";

/// Sourced in place of an activation script when no virtual environment is configured
pub const NO_VENV: &str = "/dev/null";

/// A fully merged and validated job description
///
/// Produced once per invocation by [`ResolvedConfig::resolve`] and never modified afterwards.
/// The last block of fields is derived from the others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub name: String,
    pub nodes: u32,
    pub time: String,
    pub directory: PathBuf,
    pub temp_directory: PathBuf,
    pub system: Option<System>,
    pub queue_sys: QueueSystem,
    pub ppn: u32,
    pub queue: String,
    pub ompnum: u32,
    pub pernode: u32,
    pub account: Option<String>,
    pub mem: Option<String>,
    /// Activation script to source, or [`NO_VENV`]
    pub venv: PathBuf,

    pub mpiproc: u64,
    pub workdir: PathBuf,
    pub finaldir: PathBuf,
    pub usetemp: bool,
    /// This executable, so the batch script can call `run` again on the compute nodes
    pub scriptpath: PathBuf,
    pub jobdir: PathBuf,
    pub logpath: PathBuf,
    pub configpath: PathBuf,
    pub statuspath: PathBuf,
}

impl ResolvedConfig {
    /// Resolve a raw configuration document
    ///
    /// Layers are applied lowest priority first: built-in defaults, then the preset named by
    /// `cluster.system` (if any), then the user's `cluster` section.
    pub fn resolve(raw: &Value) -> Result<ResolvedConfig, ConfigError> {
        let user = read_section(raw)?;

        let system = match &user.system {
            Some(name) => Some(name.parse::<System>()?),
            None => None,
        };

        let mut merged = defaults();
        if let Some(system) = system {
            info!("Applying {system} preset");
            merged = merged.overlay(system.preset());
        }
        let merged = merged.overlay(user);
        debug!("Merged cluster section: {merged:?}");

        let missing = merged.missing_keys();
        let (Some(nodes), Some(time), Some(directory), Some(ppn), Some(queue), Some(ompnum), Some(pernode)) = (
            merged.nodes,
            merged.time,
            merged.directory,
            merged.ppn,
            merged.queue,
            merged.ompnum,
            merged.pernode,
        ) else {
            return Err(ConfigError::MissingKeys(missing));
        };

        let queue_sys = match &merged.queue_sys {
            Some(name) => name.parse::<QueueSystem>()?,
            None => return Err(ConfigError::MissingKeys(vec!["queue_sys"])),
        };

        let nodes = u32::try_from(nodes)
            .ok()
            .filter(|n| *n > 0)
            .ok_or(ConfigError::InvalidNodes(nodes))?;

        for (key, value) in [("ppn", ppn), ("ompnum", ompnum), ("pernode", pernode)] {
            if value == 0 {
                return Err(ConfigError::Zero(key));
            }
        }

        let (directory, finaldir) = absolute_dir("directory", &directory)?;
        let (temp_directory, workdir) = match &merged.temp_directory {
            Some(temp) => absolute_dir("temp_directory", temp)?,
            None => (directory.clone(), finaldir.clone()),
        };
        let usetemp = workdir != finaldir;

        let venv = match &merged.venv {
            Some(venv) => activation_script(venv)?,
            None => PathBuf::from(NO_VENV),
        };

        let scriptpath = launcher_path()?;

        let jobdir = workdir.join(JOB_SUBDIR);
        let logpath = jobdir.join(LOG_NAME);
        let configpath = jobdir.join(CONFIG_NAME);
        let statuspath = jobdir.join(STATUS_NAME);

        Ok(ResolvedConfig {
            name: merged.name.unwrap_or_else(|| "job".to_string()),
            nodes,
            time,
            directory,
            temp_directory,
            system,
            queue_sys,
            ppn,
            queue,
            ompnum,
            pernode,
            account: merged.account,
            mem: merged.mem,
            venv,
            mpiproc: u64::from(nodes) * u64::from(pernode),
            workdir,
            finaldir,
            usetemp,
            scriptpath,
            jobdir,
            logpath,
            configpath,
            statuspath,
        })
    }
}

fn read_section(raw: &Value) -> Result<ClusterSection, ConfigError> {
    match raw.get("cluster") {
        None => Err(ConfigError::MissingCluster),
        Some(Value::Null) => Ok(ClusterSection::default()),
        Some(section) => Ok(serde_yaml::from_value(section.clone())?),
    }
}

/// Expand a directory and insist it's absolute; returns (expanded, canonical)
///
/// Relative directories are rejected, never resolved against the current directory.
fn absolute_dir(key: &'static str, raw: &str) -> Result<(PathBuf, PathBuf), ConfigError> {
    let expanded = expand_path(raw);
    if !expanded.is_absolute() {
        return Err(ConfigError::RelativeDirectory { key, path: expanded });
    }
    Ok((expanded, fix_path(raw)))
}

fn activation_script(venv: &str) -> Result<PathBuf, ConfigError> {
    let script = fix_path(venv).join("bin").join("activate");
    if !script.is_file() {
        return Err(ConfigError::MissingVenv(script));
    }
    Ok(script)
}

fn launcher_path() -> Result<PathBuf, ConfigError> {
    let exe = env::current_exe().map_err(ConfigError::LauncherPath)?;
    Ok(fix_path(&exe.to_string_lossy()))
}
