use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;

use crate::loglevel::LogLevel;
use crate::pipeline::ExternalEngine;
use crate::queue::submit::Submission;

mod cluster;
mod error;
mod loglevel;
mod path;
mod pipeline;
mod queue;

#[derive(Parser, Debug)]
#[command(author, version, about = "Run pipelines, or queue them on a PBS or SLURM cluster", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a pipeline from a YAML configuration file
    Run {
        /// Pipeline configuration file
        configfile: PathBuf,
        /// Log verbosity, also passed to the pipeline engine
        #[arg(long, value_enum, ignore_case = true, default_value_t = LogLevel::Info)]
        loglevel: LogLevel,
        /// Pipeline engine executable
        #[arg(long, env = "PIPELINE_ENGINE", default_value = "pipeline-engine")]
        engine: String,
    },
    /// Write a batch script for a pipeline and submit it to the cluster queue
    Queue {
        /// Pipeline configuration file with a `cluster` section
        configfile: PathBuf,
        /// Write the job directory and script but don't submit
        #[arg(long)]
        nosubmit: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Run { configfile, loglevel, engine } => {
            env_logger::Builder::new().filter_level(loglevel.level_filter()).init();
            let engine = ExternalEngine { program: engine };
            let code = pipeline::run(&configfile, loglevel, &engine)
                .with_context(|| format!("Can't run pipeline {}", configfile.display()))?;
            if code != 0 {
                process::exit(code);
            }
        }
        Commands::Queue { configfile, nosubmit } => {
            env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
            let submission = queue::launch(&configfile, nosubmit)
                .with_context(|| format!("Can't queue job for {}", configfile.display()))?;
            match submission {
                Submission::Suppressed => info!("Job prepared, not submitted"),
                Submission::Submitted => info!("Job submitted"),
            }
        }
    }

    Ok(())
}
