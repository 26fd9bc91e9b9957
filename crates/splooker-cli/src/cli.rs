use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "splooker")]
#[command(version, about = "Zero-downtime container deploys behind nginx")]
pub struct Cli {
    /// Base directory holding the registry and service definitions
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the base directory layout and an empty registry
    #[command(alias = "init")]
    Setup {
        /// Overwrite an existing registry
        #[arg(long)]
        force: bool,
    },
    /// Deploy a new instance of a service and cut traffic over to it
    #[command(alias = "deploy")]
    Run {
        /// Name of the service
        #[arg(long)]
        name: String,
    },
    /// Show the port pool and current assignments
    Status,
    /// Remove instances left behind by interrupted deployments
    Sweep,
}
