//! The `run` command: load a pipeline configuration and hand it to the pipeline engine
//!
//! Everything about executing the pipeline (stages, data flow, parallelism) belongs to the
//! engine. This module only checks the configuration can be read and passes it on.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, info};
use serde_yaml::Value;

use crate::error::LaunchError;
use crate::loglevel::LogLevel;
use crate::path::fix_path;
use crate::queue::read_config;

/// State for a single `run`, created fresh each time and handed to the engine by value
#[derive(Debug, Clone, PartialEq)]
pub struct RunContext {
    pub config_path: PathBuf,
    pub loglevel: LogLevel,
    pub document: Value,
    /// Products handed between pipeline stages, keyed by name; starts empty and dies with the run
    pub products: BTreeMap<String, Value>,
}

impl RunContext {
    pub fn load(config_path: &Path, loglevel: LogLevel) -> Result<RunContext, LaunchError> {
        let document = read_config(config_path)?;
        Ok(RunContext {
            config_path: fix_path(&config_path.to_string_lossy()),
            loglevel,
            document,
            products: BTreeMap::new(),
        })
    }

    /// Top-level sections of the document, the `cluster` section included
    pub fn sections(&self) -> Vec<String> {
        match &self.document {
            Value::Mapping(map) => map.keys().filter_map(|key| key.as_str().map(str::to_string)).collect(),
            _ => Vec::new(),
        }
    }
}

/// Something that can execute a pipeline; returns the process exit code
pub trait PipelineEngine {
    fn run(&self, context: RunContext) -> Result<i32, LaunchError>;
}

/// An engine in a separate executable, called as `<program> <configfile> --loglevel <LEVEL>`
pub struct ExternalEngine {
    pub program: String,
}

impl PipelineEngine for ExternalEngine {
    fn run(&self, context: RunContext) -> Result<i32, LaunchError> {
        debug!("Pipeline sections: {}", context.sections().join(", "));
        debug!("{} products carried into the run", context.products.len());

        let mut command = Command::new(&self.program);
        let cmd = command
            .arg(&context.config_path)
            .arg("--loglevel")
            .arg(context.loglevel.to_string());
        info!("Starting pipeline engine");
        info!("{:?}", &cmd);

        let status = cmd
            .status()
            .map_err(|source| LaunchError::Engine { program: self.program.clone(), source })?;
        // killed by a signal
        Ok(status.code().unwrap_or(1))
    }
}

pub fn run(config_path: &Path, loglevel: LogLevel, engine: &dyn PipelineEngine) -> Result<i32, LaunchError> {
    let context = RunContext::load(config_path, loglevel)?;
    engine.run(context)
}
