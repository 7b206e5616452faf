use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "stagehand", version, about = "Pipeline worker plugin harness")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one task plugin and dispatch the commands it emits.
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Task plugin id to execute.
    #[arg(long)]
    pub plugin: String,

    /// JSON file holding the task execution context. Defaults to an empty
    /// context.
    #[arg(long)]
    pub context: Option<PathBuf>,

    /// Override the configured working directory for this invocation.
    #[arg(long)]
    pub work_dir: Option<PathBuf>,
}
