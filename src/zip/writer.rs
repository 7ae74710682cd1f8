//! ZIP container writing.
//!
//! [`ZipWriter`] builds an archive incrementally over any byte sink. Entries
//! arrive through one of two paths:
//!
//! - [`write_entry`](ZipWriter::write_entry) takes uncompressed bytes,
//!   compresses them with the writer's configured codec and fills in the
//!   CRC-32 and both sizes from what was actually written.
//! - [`write_raw_entry`](ZipWriter::write_raw_entry) takes an
//!   already-compressed payload together with a fully populated header and
//!   stores both unmodified, which is what makes recompression-free
//!   archive-to-archive copying possible.
//!
//! Nothing is durable until [`finish`](ZipWriter::finish) writes the central
//! directory, the optional archive comment and the end-of-directory record.
//! Dropping an unfinished writer releases the sink but leaves no usable
//! container behind.

use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::DeflateEncoder;

use crate::error::{Error, Result};

use super::structures::*;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Deflate effort for entries the writer compresses itself.
///
/// A pure speed/size trade-off with no effect on correctness. Fixed at
/// writer construction and applied uniformly to every non-raw entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeflateLevel {
    Fastest,
    #[default]
    Default,
    Best,
}

impl DeflateLevel {
    fn compression(self) -> Compression {
        match self {
            DeflateLevel::Fastest => Compression::fast(),
            DeflateLevel::Default => Compression::default(),
            DeflateLevel::Best => Compression::best(),
        }
    }
}

/// Incremental ZIP archive writer.
pub struct ZipWriter<W: Write> {
    out: W,
    level: DeflateLevel,
    /// Bytes written so far; doubles as the next local header offset.
    offset: u64,
    directory: Vec<ZipEntry>,
    comment: String,
}

impl ZipWriter<BufWriter<File>> {
    /// Create an archive file, truncating anything already at `path`.
    pub fn create(path: &Path, level: DeflateLevel) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), level))
    }
}

impl<W: Write> ZipWriter<W> {
    /// Start an archive over an arbitrary sink.
    pub fn new(out: W, level: DeflateLevel) -> Self {
        Self {
            out,
            level,
            offset: 0,
            directory: Vec::new(),
            comment: String::new(),
        }
    }

    /// Compress `data` and append it under `header`'s name and method.
    ///
    /// CRC-32 and both sizes are computed here from the bytes consumed,
    /// never trusted from the caller. Names ending in `/` become directory
    /// entries: stored, with `data` ignored.
    pub fn write_entry(&mut self, mut header: ZipEntry, data: &mut impl Read) -> Result<()> {
        let mut hasher = crc32fast::Hasher::new();
        let mut uncompressed = 0u64;

        let payload = if header.is_directory() {
            header.method = CompressionMethod::Stored;
            Vec::new()
        } else {
            let mut buf = [0u8; COPY_BUFFER_SIZE];
            match header.method {
                CompressionMethod::Stored => {
                    let mut payload = Vec::new();
                    loop {
                        let n = data.read(&mut buf)?;
                        if n == 0 {
                            break;
                        }
                        hasher.update(&buf[..n]);
                        payload.extend_from_slice(&buf[..n]);
                        uncompressed += n as u64;
                    }
                    payload
                }
                CompressionMethod::Deflate => {
                    let mut encoder = DeflateEncoder::new(Vec::new(), self.level.compression());
                    loop {
                        let n = data.read(&mut buf)?;
                        if n == 0 {
                            break;
                        }
                        hasher.update(&buf[..n]);
                        encoder.write_all(&buf[..n])?;
                        uncompressed += n as u64;
                    }
                    encoder.finish()?
                }
                CompressionMethod::Unknown(v) => return Err(Error::UnsupportedMethod(v)),
            }
        };

        header.crc32 = hasher.finalize();
        header.compressed_size = payload.len() as u64;
        header.uncompressed_size = uncompressed;
        // Sizes are known up front, so no data descriptor follows
        header.flags &= !FLAG_DATA_DESCRIPTOR;

        log::debug!(
            "writing entry '{}': {} -> {} bytes",
            header.name,
            header.uncompressed_size,
            header.compressed_size
        );

        self.write_local_header(&mut header)?;
        self.out.write_all(&payload)?;
        self.offset += payload.len() as u64;
        self.directory.push(header);
        Ok(())
    }

    /// Append an entry whose payload is already compressed.
    ///
    /// `header`'s name, method, flags, CRC-32 and sizes are written exactly
    /// as given; nothing is verified or recomputed. Exactly
    /// `header.compressed_size` bytes are copied from `raw`; a shorter
    /// stream fails with [`Error::SizeMismatch`].
    pub fn write_raw_entry(&mut self, header: &ZipEntry, raw: &mut impl Read) -> Result<()> {
        let mut header = header.clone();

        log::debug!(
            "raw-copying entry '{}': {} bytes",
            header.name,
            header.compressed_size
        );

        self.write_local_header(&mut header)?;

        let mut remaining = header.compressed_size;
        let mut buf = [0u8; COPY_BUFFER_SIZE];
        while remaining > 0 {
            let want = buf.len().min(remaining.min(usize::MAX as u64) as usize);
            let n = raw.read(&mut buf[..want])?;
            if n == 0 {
                return Err(Error::SizeMismatch {
                    name: header.name.clone(),
                    declared: header.compressed_size,
                    actual: header.compressed_size - remaining,
                });
            }
            self.out.write_all(&buf[..n])?;
            self.offset += n as u64;
            remaining -= n as u64;
        }

        // Entries flagged for a data descriptor keep that shape: the local
        // header carried zeros and the real values trail the payload.
        if header.flags & FLAG_DATA_DESCRIPTOR != 0 {
            let (csize, usize_) = self.u32_sizes(&header)?;
            self.out.write_all(DATA_DESCRIPTOR_SIGNATURE)?;
            self.out.write_u32::<LittleEndian>(header.crc32)?;
            self.out.write_u32::<LittleEndian>(csize)?;
            self.out.write_u32::<LittleEndian>(usize_)?;
            self.offset += 16;
        }

        self.directory.push(header);
        Ok(())
    }

    /// Store the archive-level comment, applied at [`finish`](Self::finish).
    pub fn set_comment(&mut self, text: impl Into<String>) {
        self.comment = text.into();
    }

    /// Write the central directory and end-of-directory record, flush, and
    /// hand back the sink. Until this runs the output is not a valid
    /// archive.
    pub fn finish(mut self) -> Result<W> {
        let cd_offset = self.offset;

        let directory = std::mem::take(&mut self.directory);
        for entry in &directory {
            self.write_central_header(entry)?;
        }

        let cd_size = self.offset - cd_offset;
        let total_entries = u16::try_from(directory.len())
            .map_err(|_| Error::Unsupported("more than 65535 entries".to_string()))?;
        let comment_len = u16::try_from(self.comment.len())
            .map_err(|_| Error::Unsupported("archive comment exceeds 65535 bytes".to_string()))?;

        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            disk_with_cd: 0,
            disk_entries: total_entries,
            total_entries,
            cd_size: u32::try_from(cd_size)
                .map_err(|_| Error::Unsupported("central directory exceeds 4 GiB".to_string()))?,
            cd_offset: u32::try_from(cd_offset)
                .map_err(|_| Error::Unsupported("archive exceeds 4 GiB".to_string()))?,
            comment_len,
        };
        eocd.write_to(&mut self.out)?;
        self.out.write_all(self.comment.as_bytes())?;
        self.out.flush()?;

        log::debug!(
            "finalized archive: {} entries, central directory {} bytes",
            directory.len(),
            cd_size
        );

        Ok(self.out)
    }

    /// Sizes as 32-bit wire fields, refusing anything that would need ZIP64.
    fn u32_sizes(&self, entry: &ZipEntry) -> Result<(u32, u32)> {
        let csize = u32::try_from(entry.compressed_size);
        let usize_ = u32::try_from(entry.uncompressed_size);
        match (csize, usize_) {
            (Ok(c), Ok(u)) => Ok((c, u)),
            _ => Err(Error::Unsupported(format!(
                "entry '{}' exceeds 32-bit size fields",
                entry.name
            ))),
        }
    }

    fn write_local_header(&mut self, entry: &mut ZipEntry) -> Result<()> {
        let name = entry.name.as_bytes();
        let name_len = u16::try_from(name.len())
            .map_err(|_| Error::Unsupported("entry name exceeds 65535 bytes".to_string()))?;

        entry.lfh_offset = self.offset;
        if entry.lfh_offset > u32::MAX as u64 {
            return Err(Error::Unsupported("archive exceeds 4 GiB".to_string()));
        }

        // With the data descriptor flag set, CRC and sizes live after the
        // payload and the local header carries zeros.
        let (crc, csize, usize_) = if entry.flags & FLAG_DATA_DESCRIPTOR != 0 {
            (0, 0, 0)
        } else {
            let (c, u) = self.u32_sizes(entry)?;
            (entry.crc32, c, u)
        };

        self.out.write_all(LFH_SIGNATURE)?;
        self.out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        self.out.write_u16::<LittleEndian>(entry.flags)?;
        self.out.write_u16::<LittleEndian>(entry.method.as_u16())?;
        self.out.write_u16::<LittleEndian>(entry.last_mod_time)?;
        self.out.write_u16::<LittleEndian>(entry.last_mod_date)?;
        self.out.write_u32::<LittleEndian>(crc)?;
        self.out.write_u32::<LittleEndian>(csize)?;
        self.out.write_u32::<LittleEndian>(usize_)?;
        self.out.write_u16::<LittleEndian>(name_len)?;
        self.out.write_u16::<LittleEndian>(0)?; // extra field length
        self.out.write_all(name)?;

        self.offset += (LFH_SIZE + name.len()) as u64;
        Ok(())
    }

    fn write_central_header(&mut self, entry: &ZipEntry) -> Result<()> {
        let name = entry.name.as_bytes();
        let (csize, usize_) = self.u32_sizes(entry)?;

        let (version_made_by, external_attrs) = match entry.unix_mode {
            Some(mode) => {
                let mut attrs = mode << 16;
                if entry.is_directory() {
                    attrs |= 0x10; // DOS directory attribute
                }
                (VERSION_MADE_BY_UNIX, attrs)
            }
            None => (
                VERSION_NEEDED,
                if entry.is_directory() { 0x10 } else { 0 },
            ),
        };

        self.out.write_all(CDFH_SIGNATURE)?;
        self.out.write_u16::<LittleEndian>(version_made_by)?;
        self.out.write_u16::<LittleEndian>(VERSION_NEEDED)?;
        self.out.write_u16::<LittleEndian>(entry.flags)?;
        self.out.write_u16::<LittleEndian>(entry.method.as_u16())?;
        self.out.write_u16::<LittleEndian>(entry.last_mod_time)?;
        self.out.write_u16::<LittleEndian>(entry.last_mod_date)?;
        self.out.write_u32::<LittleEndian>(entry.crc32)?;
        self.out.write_u32::<LittleEndian>(csize)?;
        self.out.write_u32::<LittleEndian>(usize_)?;
        self.out.write_u16::<LittleEndian>(name.len() as u16)?;
        self.out.write_u16::<LittleEndian>(0)?; // extra field length
        self.out.write_u16::<LittleEndian>(0)?; // file comment length
        self.out.write_u16::<LittleEndian>(0)?; // disk number start
        self.out.write_u16::<LittleEndian>(0)?; // internal attributes
        self.out.write_u32::<LittleEndian>(external_attrs)?;
        self.out.write_u32::<LittleEndian>(entry.lfh_offset as u32)?;
        self.out.write_all(name)?;

        self.offset += (CDFH_MIN_SIZE + name.len()) as u64;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zip::reader::ZipReader;
    use std::io::Read;
    use std::sync::Arc;

    fn read_all(reader: &ZipReader<Vec<u8>>, entry: &ZipEntry) -> Vec<u8> {
        let mut out = Vec::new();
        reader
            .entry_reader(entry)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn written_archive_reads_back() {
        let mut writer = ZipWriter::new(Vec::new(), DeflateLevel::Default);
        writer
            .write_entry(ZipEntry::new("hello.txt"), &mut &b"hello, zip"[..])
            .unwrap();
        let mut stored = ZipEntry::new("stored.bin");
        stored.method = CompressionMethod::Stored;
        writer
            .write_entry(stored, &mut &[0u8, 1, 2, 3][..])
            .unwrap();
        writer.write_entry(ZipEntry::new("sub/"), &mut std::io::empty()).unwrap();
        writer.set_comment("archive comment");
        let bytes = writer.finish().unwrap();

        let reader = ZipReader::new(Arc::new(bytes)).unwrap();
        assert_eq!(reader.comment(), "archive comment");

        let entries = reader.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "hello.txt");
        assert_eq!(entries[0].method, CompressionMethod::Deflate);
        assert_eq!(entries[0].uncompressed_size, 10);
        assert_eq!(read_all(&reader, &entries[0]), b"hello, zip");

        assert_eq!(entries[1].method, CompressionMethod::Stored);
        assert_eq!(entries[1].compressed_size, 4);
        assert_eq!(read_all(&reader, &entries[1]), [0, 1, 2, 3]);

        assert!(entries[2].is_directory());
        assert_eq!(entries[2].method, CompressionMethod::Stored);
        assert_eq!(entries[2].compressed_size, 0);
    }

    #[test]
    fn raw_copy_preserves_header_fields() {
        let mut writer = ZipWriter::new(Vec::new(), DeflateLevel::Best);
        writer
            .write_entry(ZipEntry::new("data.txt"), &mut &b"abcabcabcabc"[..])
            .unwrap();
        let bytes = writer.finish().unwrap();
        let source = ZipReader::new(Arc::new(bytes)).unwrap();
        let original = source.entries()[0].clone();

        let mut copier = ZipWriter::new(Vec::new(), DeflateLevel::Fastest);
        let mut raw = source.raw_reader(&original).unwrap();
        copier.write_raw_entry(&original, &mut raw).unwrap();
        let copied_bytes = copier.finish().unwrap();

        let copy = ZipReader::new(Arc::new(copied_bytes)).unwrap();
        let entry = &copy.entries()[0];
        assert_eq!(entry.name, original.name);
        assert_eq!(entry.crc32, original.crc32);
        assert_eq!(entry.compressed_size, original.compressed_size);
        assert_eq!(entry.uncompressed_size, original.uncompressed_size);
        assert_eq!(read_all(&copy, entry), b"abcabcabcabc");
    }

    #[test]
    fn short_raw_payload_is_a_size_mismatch() {
        let mut writer = ZipWriter::new(Vec::new(), DeflateLevel::Default);
        let mut header = ZipEntry::new("short.bin");
        header.method = CompressionMethod::Stored;
        header.compressed_size = 10;
        header.uncompressed_size = 10;

        let err = writer
            .write_raw_entry(&header, &mut &b"1234"[..])
            .unwrap_err();
        match err {
            Error::SizeMismatch {
                declared, actual, ..
            } => {
                assert_eq!(declared, 10);
                assert_eq!(actual, 4);
            }
            other => panic!("expected SizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn unfinished_writer_leaves_no_valid_archive() {
        let mut writer = ZipWriter::new(Vec::new(), DeflateLevel::Default);
        writer
            .write_entry(ZipEntry::new("a.txt"), &mut &b"a"[..])
            .unwrap();
        // No finish(): the sink holds a local header but no central directory.
        let bytes = writer.out;
        assert!(ZipReader::new(Arc::new(bytes)).is_err());
    }
}
