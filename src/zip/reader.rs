//! Low-level ZIP archive reading.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. For each entry, read its Local File Header to locate the payload
//!
//! The central directory is parsed once at open time; the resulting entry
//! list is stable and can be iterated any number of times. Per entry the
//! reader hands out either the payload bytes exactly as stored (for raw
//! copying into another container) or a decompressed stream that verifies
//! the entry's CRC-32 once fully read.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use flate2::read::DeflateDecoder;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// A parsed ZIP container.
///
/// Opening reads the central directory eagerly; everything after that is
/// positional reads against the underlying source, so multiple entry
/// streams can coexist. The source handle is released on drop.
///
/// ## Example
///
/// ```no_run
/// use rezip::ZipReader;
///
/// # fn main() -> rezip::Result<()> {
/// let reader = ZipReader::open("archive.zip".as_ref())?;
/// for entry in reader.entries() {
///     println!("{} ({} bytes)", entry.name, entry.uncompressed_size);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ZipReader<R: ReadAt = LocalFileReader> {
    /// The underlying data source
    source: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
    entries: Vec<ZipEntry>,
    comment: String,
}

impl ZipReader<LocalFileReader> {
    /// Open an archive file from the local filesystem.
    pub fn open(path: &Path) -> Result<Self> {
        let source = LocalFileReader::new(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        Self::new(Arc::new(source))
    }
}

impl<R: ReadAt> ZipReader<R> {
    /// Parse an archive from any random-access source.
    pub fn new(source: Arc<R>) -> Result<Self> {
        let size = source.size();
        let mut reader = Self {
            source,
            size,
            entries: Vec::new(),
            comment: String::new(),
        };
        reader.read_central_directory()?;
        Ok(reader)
    }

    /// All entries, in central directory (= physical) order.
    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    /// The archive-level comment, empty if none was stored.
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// The EOCD is located at the end of the ZIP file. This method
    /// handles both the simple case (no comment) and archives with
    /// comments by searching backwards for the signature.
    fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        // First try the simple case where there's no comment. This avoids
        // reading extra data in the common case.
        if self.size >= EndOfCentralDirectory::SIZE as u64 {
            let offset = self.size - EndOfCentralDirectory::SIZE as u64;
            let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
            self.source.read_exact_at(offset, &mut buf)?;

            // Check for signature and zero-length comment
            if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
                let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
                return Ok((eocd, offset));
            }
        }

        // EOCD not at expected location - search for it.
        // The EOCD could be earlier if there's a ZIP comment.
        // We need to search backwards from the end of the file.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.source.read_exact_at(search_start, &mut buf)?;

        // Search backwards for EOCD signature (PK\x05\x06)
        for i in (0..buf.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // Found a potential EOCD - verify the comment length is correct.
                // The comment length field should match the remaining bytes.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd =
                        EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::Corrupt("not a valid ZIP file".to_string()))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD indicates ZIP64 extensions are needed
    /// (fields set to 0xFFFF or 0xFFFFFFFF).
    fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The ZIP64 EOCD Locator is located immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::Corrupt("missing ZIP64 locator".to_string()))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.source.read_exact_at(locator_offset, &mut locator_buf)?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        // Read the actual ZIP64 EOCD from the offset specified in the locator
        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.source
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Parse the central directory and archive comment into memory.
    fn read_central_directory(&mut self) -> Result<()> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        if eocd.comment_len > 0 {
            let mut comment = vec![0u8; eocd.comment_len as usize];
            self.source
                .read_exact_at(eocd_offset + EndOfCentralDirectory::SIZE as u64, &mut comment)?;
            self.comment = String::from_utf8_lossy(&comment).to_string();
        }

        // Get Central Directory info, using ZIP64 if needed
        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        if cd_offset.checked_add(cd_size).is_none_or(|end| end > self.size) {
            return Err(Error::Corrupt(
                "central directory extends past end of file".to_string(),
            ));
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        self.source.read_exact_at(cd_offset, &mut cd_data)?;

        // Parse each Central Directory File Header entry
        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(&cd_data);

        for _ in 0..total_entries {
            entries.push(parse_cdfh(&mut cursor)?);
        }

        log::debug!(
            "parsed central directory: {} entries, comment {} bytes",
            entries.len(),
            self.comment.len()
        );

        self.entries = entries;
        Ok(())
    }

    /// Locate an entry's payload within the container.
    ///
    /// The Local File Header (LFH) has variable-length fields (filename,
    /// extra field) that may differ from the Central Directory entry, so
    /// the payload offset can only be computed by reading it.
    fn data_offset(&self, entry: &ZipEntry) -> Result<u64> {
        let mut lfh_buf = vec![0u8; LFH_SIZE];
        self.source.read_exact_at(entry.lfh_offset, &mut lfh_buf)?;

        // Verify LFH signature (PK\x03\x04)
        if &lfh_buf[0..4] != LFH_SIGNATURE {
            return Err(Error::Corrupt(format!(
                "invalid local header for entry '{}'",
                entry.name
            )));
        }

        // Read the variable field lengths from fixed positions in LFH
        let mut cursor = Cursor::new(&lfh_buf);
        cursor.set_position(26); // Offset to filename length field

        let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
        let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

        // Data starts after: LFH (30 bytes) + filename + extra field
        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }

    /// The entry's payload exactly as stored: `compressed_size` bytes,
    /// no decompression, no checksum verification.
    ///
    /// Fails with [`Error::Corrupt`] when the declared payload extends past
    /// the end of the container.
    pub fn raw_reader(&self, entry: &ZipEntry) -> Result<RawEntryReader<R>> {
        let offset = self.data_offset(entry)?;
        if offset
            .checked_add(entry.compressed_size)
            .is_none_or(|end| end > self.size)
        {
            return Err(Error::Corrupt(format!(
                "payload of entry '{}' is truncated",
                entry.name
            )));
        }
        Ok(RawEntryReader {
            source: Arc::clone(&self.source),
            offset,
            remaining: entry.compressed_size,
        })
    }

    /// The entry's decompressed bytes.
    ///
    /// The stream verifies the stored CRC-32 when it has been fully read;
    /// a mismatch surfaces as an `InvalidData` read error.
    pub fn entry_reader(&self, entry: &ZipEntry) -> Result<EntryReader<R>> {
        let raw = self.raw_reader(entry)?;
        let inner = match entry.method {
            CompressionMethod::Stored => InnerReader::Stored(raw),
            CompressionMethod::Deflate => InnerReader::Deflated(DeflateDecoder::new(raw)),
            CompressionMethod::Unknown(v) => return Err(Error::UnsupportedMethod(v)),
        };
        Ok(EntryReader {
            inner,
            hasher: crc32fast::Hasher::new(),
            expected: entry.crc32,
            name: entry.name.clone(),
            checked: false,
        })
    }
}

/// Parse a Central Directory File Header from a cursor.
fn parse_cdfh(cursor: &mut Cursor<&Vec<u8>>) -> Result<ZipEntry> {
    // Read and verify the signature (PK\x01\x02)
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::Corrupt(
            "invalid central directory file header".to_string(),
        ));
    }

    // Read fixed-size header fields
    let version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    // Read the variable-length file name
    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    // Use lossy conversion to handle non-UTF8 filenames gracefully
    let name = String::from_utf8_lossy(&file_name_bytes).to_string();

    // Parse extra field for ZIP64 extended information
    // ZIP64 uses extra field ID 0x0001
    let extra_field_end = cursor.position() + extra_field_length as u64;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;

        if header_id == 0x0001 {
            // ZIP64 extended information extra field
            // Fields are present only if corresponding header field is 0xFFFFFFFF
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= extra_field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= extra_field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= extra_field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
            // Skip any remaining ZIP64 fields (disk number start)
            let remaining = extra_field_end.saturating_sub(cursor.position());
            cursor.set_position(cursor.position() + remaining);
        } else {
            // Skip unknown extra fields
            cursor.set_position(cursor.position() + field_size as u64);
        }
    }

    // Ensure cursor is positioned after extra field
    cursor.set_position(extra_field_end);

    // Skip over the file comment (we don't use it)
    cursor.set_position(cursor.position() + file_comment_length as u64);

    // Unix-made entries carry st_mode in the upper external attribute bits
    let unix_mode = if version_made_by >> 8 == 3 {
        Some(external_attrs >> 16)
    } else {
        None
    };

    Ok(ZipEntry {
        name,
        method: CompressionMethod::from_u16(compression_method),
        flags,
        crc32,
        compressed_size,
        uncompressed_size,
        last_mod_time,
        last_mod_date,
        unix_mode,
        lfh_offset,
    })
}

/// Streams an entry's payload bytes exactly as stored in the container.
pub struct RawEntryReader<R: ReadAt> {
    source: Arc<R>,
    offset: u64,
    remaining: u64,
}

impl<R: ReadAt> Read for RawEntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = buf.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.source.read_at(self.offset, &mut buf[..want])?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "entry payload truncated",
            ));
        }
        self.offset += n as u64;
        self.remaining -= n as u64;
        Ok(n)
    }
}

enum InnerReader<R: ReadAt> {
    Stored(RawEntryReader<R>),
    Deflated(DeflateDecoder<RawEntryReader<R>>),
}

/// Decompressing stream over one entry, CRC-checked at end of stream.
pub struct EntryReader<R: ReadAt> {
    inner: InnerReader<R>,
    hasher: crc32fast::Hasher,
    expected: u32,
    name: String,
    checked: bool,
}

impl<R: ReadAt> Read for EntryReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = match &mut self.inner {
            InnerReader::Stored(r) => r.read(buf)?,
            InnerReader::Deflated(r) => r.read(buf)?,
        };
        if n > 0 {
            self.hasher.update(&buf[..n]);
        } else if !buf.is_empty() && !self.checked {
            self.checked = true;
            let actual = std::mem::take(&mut self.hasher).finalize();
            if actual != self.expected {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "CRC mismatch for entry '{}': expected {:#010x}, got {:#010x}",
                        self.name, self.expected, actual
                    ),
                ));
            }
        }
        Ok(n)
    }
}
