use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::logging::Verbosity;

#[derive(Parser, Debug)]
#[clap(name = "clip-locate", about = "Find where a short clip was taken from")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,

    /// Suppress informational output; only warnings and errors are logged.
    #[clap(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit per-frame/per-shot trace-level progress.
    #[clap(short = 'v', long, global = true)]
    pub verbose: bool,
}

impl Cli {
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Default
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build or refresh the index for one or more source videos.
    Index {
        cache_file: PathBuf,
        #[clap(required = true)]
        video_paths: Vec<PathBuf>,
    },
    /// Locate which indexed source video a clip was taken from.
    Locate {
        cache_file: PathBuf,
        clip_path: PathBuf,
        clip_rgb_path: PathBuf,
    },
}
