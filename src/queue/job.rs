use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::cluster::resolve::{CONFIG_NAME, SCRIPT_NAME};
use crate::cluster::ResolvedConfig;
use crate::error::LaunchError;
use crate::path::fix_path;
use crate::queue::script::JobScript;

/// A job directory on disk, holding a configuration copy and the job script
///
/// The launcher creates it and never deletes it. Once the job runs, the script adds the log and
/// status files next to these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDirectory {
    pub path: PathBuf,
    pub config: PathBuf,
    pub script: PathBuf,
}

/// Create the job directory, copy the configuration into it and write the job script
///
/// Safe to run repeatedly against the same directory: the copy and script are overwritten.
pub fn materialize(config: &ResolvedConfig, source: &Path, script: &JobScript) -> Result<JobDirectory, LaunchError> {
    let path = config.jobdir.clone();
    if path.exists() {
        warn!("Job directory {} already exists, job files will be overwritten", path.display());
    } else {
        info!("Creating job directory {}", path.display());
    }
    fs::create_dir_all(&path).map_err(|err| LaunchError::filesystem(&path, err))?;

    let job = JobDirectory { config: path.join(CONFIG_NAME), script: path.join(SCRIPT_NAME), path };
    copy_config(source, &job.config)?;
    write_script(script, &job.script)?;

    Ok(job)
}

/// Copy the user's configuration, unless it already is the copy
fn copy_config(source: &Path, destination: &Path) -> Result<(), LaunchError> {
    let same = fix_path(&source.to_string_lossy()) == fix_path(&destination.to_string_lossy());
    if same {
        info!("Configuration {} is already in the job directory", source.display());
        return Ok(());
    }

    info!("Copying configuration {} to {}", source.display(), destination.display());
    fs::copy(source, destination).map_err(|err| LaunchError::filesystem(destination, err))?;
    Ok(())
}

fn write_script(script: &JobScript, out_path: &Path) -> Result<(), LaunchError> {
    info!("Writing job script to {}", out_path.display());
    fs::write(out_path, &script.content).map_err(|err| LaunchError::filesystem(out_path, err))?;
    fs::set_permissions(out_path, fs::Permissions::from_mode(0o755))
        .map_err(|err| LaunchError::filesystem(out_path, err))
}
