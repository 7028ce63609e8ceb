use crate::app::config::{DEFAULT_BIND, DEFAULT_SETTINGS_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Browse a directory, pick files, and concatenate them for LLM questions"
)]
pub struct Cli {
    /// Settings file (created with defaults if missing)
    #[arg(long, default_value = DEFAULT_SETTINGS_PATH)]
    pub settings: PathBuf,

    /// Use this base directory for this run without saving it
    #[arg(long)]
    pub base_dir: Option<String>,

    /// Log debug output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log only warnings and errors
    #[arg(short, long)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Address to listen on
        #[arg(long, default_value = DEFAULT_BIND)]
        bind: String,
    },

    /// Print the directory tree as JSON
    Tree,

    /// Print the concatenation of the given relative paths
    Concat {
        /// Paths relative to the base directory, in output order
        #[arg(required = true, num_args = 1..)]
        paths: Vec<String>,

        /// Prefix each line with its line number
        #[arg(long, short = 'n')]
        line_numbers: bool,
    },

    /// Change and save the base directory
    SetBaseDir {
        path: String,
    },
}
