use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::zip::DeflateLevel;

#[derive(Parser, Debug)]
#[command(name = "rezip")]
#[command(version)]
#[command(about = "Pack, unpack and repack ZIP archives without recompression", long_about = None)]
#[command(after_help = "Examples:\n  \
  rezip pack assets assets.zip              pack the assets tree into assets.zip\n  \
  rezip transcode big.zip out.zip -x a/b    repack big.zip, dropping entry a/b\n  \
  rezip list -v out.zip                     show detailed archive contents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode (no summary output)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Pack a directory tree into a new archive
    Pack {
        /// Source directory to walk
        #[arg(value_name = "DIR")]
        src_dir: PathBuf,

        /// Archive file to create (an existing file is overwritten)
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Deflate effort for file payloads
        #[arg(long, value_enum, default_value = "best")]
        level: LevelArg,
    },

    /// Unpack an archive into a directory
    Unpack {
        /// Archive file to read
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// Directory to extract into
        #[arg(value_name = "DIR")]
        dest_dir: PathBuf,
    },

    /// Repack an archive into a new one without recompressing entries
    Transcode {
        /// Source archive
        #[arg(value_name = "SRC")]
        src: PathBuf,

        /// Destination archive to create
        #[arg(value_name = "DEST")]
        dest: PathBuf,

        /// Exclude entries with these exact stored names
        #[arg(short = 'x', value_name = "NAME", num_args = 1..)]
        exclude: Vec<String>,
    },

    /// List files in an archive
    List {
        /// Archive file to read
        #[arg(value_name = "ARCHIVE")]
        archive: PathBuf,

        /// List verbosely
        #[arg(short = 'v')]
        verbose: bool,
    },
}

/// Deflate effort as a command-line value.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum LevelArg {
    Fastest,
    Default,
    Best,
}

impl From<LevelArg> for DeflateLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Fastest => DeflateLevel::Fastest,
            LevelArg::Default => DeflateLevel::Default,
            LevelArg::Best => DeflateLevel::Best,
        }
    }
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }
}
