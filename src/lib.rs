//! # rezip
//!
//! Pack, unpack and repack ZIP archives without recompressing entry
//! payloads.
//!
//! This library provides three filesystem-level operations on ZIP archives:
//! packing a directory tree into a new archive, unpacking an archive into a
//! directory tree, and transcoding one archive into another. Transcoding is
//! the interesting one: every surviving entry's already-compressed payload
//! is copied byte-for-byte together with its checksum and size metadata, so
//! repacking a multi-gigabyte archive to drop a few entries or change its
//! comment costs one sequential copy instead of a full decompress/
//! recompress cycle.
//!
//! ## Features
//!
//! - Raw (recompression-free) archive-to-archive copying with name-based
//!   entry exclusion
//! - Directory tree packing with Unix permissions and DOS timestamps
//! - Extraction with path containment enforcement and CRC verification
//! - Support for ZIP64 archives on the read side
//! - STORED (uncompressed) and DEFLATE compression methods
//!
//! ## Example
//!
//! ```no_run
//! use std::collections::HashSet;
//! use rezip::ops;
//!
//! fn main() -> rezip::Result<()> {
//!     // Repack an archive, dropping one entry, without recompressing
//!     let mut exclude = HashSet::new();
//!     exclude.insert("models/init_net.pb".to_string());
//!     let copied = ops::transcode(
//!         "models.zip".as_ref(),
//!         "models-trimmed.zip".as_ref(),
//!         &exclude,
//!     )?;
//!     println!("kept {copied} entries");
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod io;
pub mod ops;
pub mod zip;

pub use cli::{Cli, Command};
pub use error::{Error, Result};
pub use io::{LocalFileReader, ReadAt};
pub use ops::{Annotation, pack, transcode, transcode_with, unpack};
pub use zip::{CompressionMethod, DeflateLevel, ZipEntry, ZipReader, ZipWriter};
