//! Error types for archive operations.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. The variants
//! map one-to-one onto the failure modes of the pack/unpack/transcode
//! pipeline, so callers can match on the kind they care about:
//!
//! ```no_run
//! use rezip::{Error, ZipReader};
//!
//! match ZipReader::open("archive.zip".as_ref()) {
//!     Ok(reader) => println!("{} entries", reader.entries().len()),
//!     Err(Error::NotFound(path)) => eprintln!("no such archive: {}", path.display()),
//!     Err(Error::Corrupt(reason)) => eprintln!("not a usable ZIP file: {reason}"),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

use std::io;
use std::path::PathBuf;

/// The error type for all archive operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The source path does not exist.
    #[error("path not found: {0}")]
    NotFound(PathBuf),

    /// An underlying filesystem read or write failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The container is unreadable: missing or malformed central directory,
    /// a truncated payload, or a checksum mismatch on full decompression.
    #[error("corrupt archive: {0}")]
    Corrupt(String),

    /// An entry uses a compression method this crate cannot decode.
    ///
    /// Raw transcoding never hits this; only decompression does.
    #[error("unsupported compression method {0}")]
    UnsupportedMethod(u16),

    /// An entry's resolved extraction path escapes the destination root.
    #[error("entry '{0}' escapes the destination directory")]
    PathTraversal(String),

    /// A raw payload's length disagrees with its declared compressed size.
    #[error("raw payload for '{name}' is {actual} bytes, header declares {declared}")]
    SizeMismatch {
        name: String,
        declared: u64,
        actual: u64,
    },

    /// The archive needs a capability this writer does not provide,
    /// e.g. ZIP64 output for entries past the 32-bit field limits.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
