//! ZIP container reading and writing.
//!
//! ## Architecture
//!
//! The module is organized into three main components:
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`reader`]: Parsing an existing container and streaming its payloads
//! - [`writer`]: Building a new container, entry by entry
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! The reader starts from the EOCD (found at the end of the file, behind
//! the optional archive comment), then parses the Central Directory, which
//! yields every entry's metadata without touching the payloads. The writer
//! produces the same shape in forward order: local header + payload per
//! entry, then the Central Directory and EOCD at finalization.
//!
//! A payload can cross between containers in two ways: decompressed (the
//! reader inflates, the writer re-deflates) or raw (the still-compressed
//! bytes and their header metadata move verbatim). Raw copying is what the
//! transcode operation is built on.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions on the read side (archives > 4GB)
//! - STORED (no compression) and DEFLATE methods
//! - Archive comments, Unix permission attributes, DOS timestamps
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No ZIP64 output: the writer refuses entries past the 32-bit fields
//! - No BZIP2, LZMA, or other compression methods (such entries still
//!   raw-copy unharmed; only decompression is refused)

pub mod reader;
pub mod structures;
pub mod writer;

pub use reader::{EntryReader, RawEntryReader, ZipReader};
pub use structures::{CompressionMethod, ZipEntry, dos_date_time};
pub use writer::{DeflateLevel, ZipWriter};
