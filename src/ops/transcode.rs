use std::collections::HashSet;
use std::path::Path;

use crate::error::Result;
use crate::zip::{DeflateLevel, ZipEntry, ZipReader, ZipWriter};

/// The entry and comment appended to every transcoded archive.
///
/// The defaults are a conventional marker, not semantically meaningful;
/// callers with a real manifest to attach supply their own via
/// [`transcode_with`].
#[derive(Debug, Clone)]
pub struct Annotation {
    /// Name of the appended plain-text entry.
    pub file_name: String,
    /// Contents of the appended entry, compressed through the normal path.
    pub contents: String,
    /// Archive-level comment set on the destination.
    pub comment: String,
}

impl Default for Annotation {
    fn default() -> Self {
        Self {
            file_name: "readme.txt".to_string(),
            contents: "This archive contains some text files.".to_string(),
            comment: "test comment".to_string(),
        }
    }
}

/// Transcode `src_archive` into `dest_archive` with the default
/// [`Annotation`].
pub fn transcode(src_archive: &Path, dest_archive: &Path, exclude: &HashSet<String>) -> Result<u64> {
    transcode_with(src_archive, dest_archive, exclude, &Annotation::default())
}

/// Copy `src_archive`'s entries into a fresh `dest_archive` without
/// decompressing them, then append one annotation entry and comment.
///
/// Entries whose stored name is in `exclude` are skipped silently; an
/// unmatched exclusion name is not an error. For every surviving entry the
/// name, method, flags, CRC-32 and both sizes cross over verbatim together
/// with exactly `compressed_size` payload bytes — no recompression, no
/// checksum recomputation. The writer's (fast) deflate setting only ever
/// touches the one annotation entry.
///
/// Returns the number of entries raw-copied (the annotation not included).
pub fn transcode_with(
    src_archive: &Path,
    dest_archive: &Path,
    exclude: &HashSet<String>,
    annotation: &Annotation,
) -> Result<u64> {
    let reader = ZipReader::open(src_archive)?;
    // Raw copies never re-deflate, so the source's compression level is
    // irrelevant here; fastest is plenty for the annotation entry.
    let mut writer = ZipWriter::create(dest_archive, DeflateLevel::Fastest)?;

    let mut copied = 0u64;
    for entry in reader.entries() {
        if exclude.contains(&entry.name) {
            log::debug!("excluding '{}'", entry.name);
            continue;
        }

        // Only these header fields cross over; offsets and host attributes
        // are the destination writer's business.
        let header = ZipEntry {
            name: entry.name.clone(),
            method: entry.method,
            flags: entry.flags,
            crc32: entry.crc32,
            compressed_size: entry.compressed_size,
            uncompressed_size: entry.uncompressed_size,
            last_mod_time: entry.last_mod_time,
            last_mod_date: entry.last_mod_date,
            unix_mode: None,
            lfh_offset: 0,
        };

        let mut raw = reader.raw_reader(entry)?;
        writer.write_raw_entry(&header, &mut raw)?;
        copied += 1;
    }

    writer.write_entry(
        ZipEntry::new(annotation.file_name.as_str()),
        &mut annotation.contents.as_bytes(),
    )?;
    writer.set_comment(annotation.comment.as_str());
    writer.finish()?;

    Ok(copied)
}
