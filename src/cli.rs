//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hostsmith")]
#[command(author, version, about = "Deploys declarative host configuration over SSH")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Deploy directory holding nodes/ and roles/
    #[arg(short, long, default_value = ".", global = true)]
    pub directory: PathBuf,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy configured recipes to nodes
    Deploy {
        /// Only nodes whose name contains this string
        pattern: Option<String>,

        /// Activate what was written (execute scripts, restart services)
        #[arg(long)]
        apply: bool,
    },

    /// Print compiled firewall scripts without touching any node
    Render {
        /// Only nodes whose name contains this string
        pattern: Option<String>,

        /// Target OS family (debian, gentoo, redhat)
        #[arg(long, default_value = "debian")]
        os: String,
    },

    /// Run a shell command on nodes
    Exec {
        /// Command to run
        command: String,

        /// Only nodes whose name contains this string
        pattern: Option<String>,
    },

    /// List configured nodes and their recipes
    Nodes {
        /// Only nodes whose name contains this string
        pattern: Option<String>,
    },

    /// Create a deploy directory skeleton
    Init {
        /// Where to create it
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Show version
    Version,
}
