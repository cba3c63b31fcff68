use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Browse and watch a directory through a virtual filesystem")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Physical directory the virtual filesystem is rooted at
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the files and sub-directories of a directory
    Ls {
        #[clap(default_value = "/")]
        path: String,
    },
    /// Create a directory
    Mkdir {
        path: String,
        /// Create missing parents as well
        #[clap(long, short)]
        parents: bool,
    },
    /// Create an empty file unless it exists
    Touch { path: String },
    /// Delete a file, or a directory with everything below it
    Rm { path: String },
    /// Print a file's contents
    Cat { path: String },
    /// Print a file's size and timestamps
    Stat { path: String },
    /// Print changes to the direct children of a directory
    Watch {
        #[clap(default_value = "/")]
        path: String,
        /// Stop after this many seconds instead of running until interrupted
        #[clap(long, short)]
        seconds: Option<u64>,
    },
}
