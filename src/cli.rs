use crate::config::{self, ConfigOverrides, PipelineFile, RunnerConfig};
use crate::error::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// scriptseq - run an ordered list of scripts, stopping at the first failure
#[derive(Parser, Debug)]
#[command(name = "scriptseq")]
#[command(about = "Run interpreter scripts in order, halting on the first failure")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: check that every script exists and show what would run.
    ///
    /// No child process is launched.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline
    Run(PipelineArgs),
    /// Verify the interpreter, directory and every script without running anything
    Check(PipelineArgs),
}

/// Options shared by every command that needs a pipeline.
#[derive(Args, Debug, Clone, Default)]
pub struct PipelineArgs {
    /// Interpreter executable (default: Rscript)
    #[arg(short, long, env = "SCRIPTSEQ_INTERPRETER")]
    pub interpreter: Option<PathBuf>,

    /// Directory the script names are resolved against (default: scripts)
    #[arg(short = 'd', long)]
    pub scripts_dir: Option<PathBuf>,

    /// Kill a script that runs longer than this many seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// JSON pipeline file supplying any of the above plus the script list
    #[arg(short, long, value_name = "FILE")]
    pub pipeline: Option<PathBuf>,

    /// Script file names in execution order (replaces the pipeline file's list)
    #[arg(value_name = "SCRIPT")]
    pub scripts: Vec<String>,
}

impl PipelineArgs {
    /// Build the runner configuration from these flags and the optional pipeline file.
    pub fn to_config(&self, dry_run: bool) -> Result<RunnerConfig> {
        let file = self
            .pipeline
            .as_ref()
            .map(PipelineFile::load_from_file)
            .transpose()?;

        config::resolve(
            file,
            ConfigOverrides {
                interpreter: self.interpreter.clone(),
                scripts_dir: self.scripts_dir.clone(),
                scripts: self.scripts.clone(),
                timeout_secs: self.timeout,
                dry_run,
            },
        )
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
