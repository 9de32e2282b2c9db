use std::process::Command;

use log::{info, warn};

use crate::error::LaunchError;
use crate::queue::job::JobDirectory;
use crate::queue::Backend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// `--nosubmit`: the job directory was written but nothing was run
    Suppressed,
    Submitted,
}

/// Submit the job script from inside its job directory
///
/// Only the submission command itself is waited on, never the queued job. Its output (normally
/// the scheduler's job id) goes straight to the terminal.
pub fn submit(job: &JobDirectory, backend: &Backend, suppress: bool) -> Result<Submission, LaunchError> {
    if suppress {
        info!("--nosubmit set, job script left at {}", job.script.display());
        return Ok(Submission::Suppressed);
    }

    let script_name = job.script.file_name().unwrap_or(job.script.as_os_str());
    let mut command = Command::new(backend.submit_command);
    let cmd = command.arg(script_name).current_dir(&job.path);
    info!("Running {} process", backend.submit_command);
    info!("{:?}", &cmd);

    let status = cmd.status().map_err(|err| LaunchError::Submission {
        command: backend.submit_command.to_string(),
        reason: err.to_string(),
    })?;

    if !status.success() {
        warn!("{} exited with {}", backend.submit_command, status);
        return Err(LaunchError::Submission {
            command: backend.submit_command.to_string(),
            reason: status.to_string(),
        });
    }

    Ok(Submission::Submitted)
}
