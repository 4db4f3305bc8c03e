use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "playfit")]
#[command(
    author,
    version,
    about = "Normalize a media library for direct play on a fixed hardware decoder"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe every media file under a path and report what needs work
    Scan {
        /// Directory or file to scan
        path: PathBuf,

        /// Only print the summary
        #[arg(long)]
        quiet: bool,
    },

    /// Remediate media files in place
    Process {
        /// Directory or file to process
        path: PathBuf,

        /// Process the given path as a single file
        #[arg(long)]
        file: bool,

        /// Show what would be done without executing
        #[arg(long)]
        dry_run: bool,

        /// Minimal output
        #[arg(long)]
        quiet: bool,

        /// Never use the hardware encoder
        #[arg(long)]
        no_hardware: bool,
    },

    /// Copy media into a library, remediating on the way
    Import {
        /// Source file or directory
        source: PathBuf,

        /// Target library name
        #[arg(short, long, value_name = "NAME")]
        library: Option<String>,

        /// Library root path
        #[arg(short, long, value_name = "PATH")]
        root: Option<PathBuf>,

        /// Show what would be done without executing
        #[arg(long)]
        dry_run: bool,

        /// Never use the hardware encoder
        #[arg(long)]
        no_hardware: bool,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Trigger Plex library scans
    Plex {
        /// Path to scan (partial scan of the section holding it)
        path: Option<PathBuf>,

        /// Section key(s) to scan in full
        #[arg(short, long, num_args = 1..)]
        sections: Vec<String>,

        /// List library sections
        #[arg(long)]
        list: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    ValidateConfig {
        /// Config file to validate (uses default if not specified)
        path: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
