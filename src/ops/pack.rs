use std::fs::File;
use std::path::Path;

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::zip::{CompressionMethod, DeflateLevel, ZipEntry, ZipWriter, dos_date_time};

/// Pack the tree under `src_dir` into a new archive at `dest_archive`.
///
/// Entries are visited depth-first and named relative to `src_dir` with
/// `/` separators; directories get a trailing `/`. Regular files are
/// deflated at `level`, directories and special files (symlinks, devices,
/// sockets) become metadata-only entries with no payload. Any existing
/// file at `dest_archive` is truncated; a failure partway leaves a partial
/// destination behind.
///
/// Returns the number of entries written.
pub fn pack(src_dir: &Path, dest_archive: &Path, level: DeflateLevel) -> Result<u64> {
    // Surface a missing source as NotFound before touching the destination
    if let Err(e) = std::fs::metadata(src_dir) {
        return Err(if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(src_dir.to_path_buf())
        } else {
            Error::Io(e)
        });
    }

    // Clear any previous artifact; from here on a failure leaves a partial
    // or absent destination, never a stale one
    match std::fs::remove_file(dest_archive) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(Error::Io(e)),
    }

    let mut writer = ZipWriter::create(dest_archive, level)?;
    let mut count = 0u64;

    for entry in WalkDir::new(src_dir).min_depth(1).follow_links(false) {
        let entry = entry.map_err(std::io::Error::from)?;
        let metadata = entry.metadata().map_err(std::io::Error::from)?;
        let file_type = entry.file_type();

        let relative = entry.path().strip_prefix(src_dir).unwrap_or(entry.path());
        let mut name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if file_type.is_dir() {
            name.push('/');
        }

        let mut header = ZipEntry::new(name);
        let (date, time) = dos_date_time(metadata.modified()?);
        header.last_mod_date = date;
        header.last_mod_time = time;
        #[cfg(unix)]
        {
            use std::os::unix::fs::MetadataExt;
            header.unix_mode = Some(metadata.mode());
        }

        log::debug!("adding '{}'", header.name);

        if file_type.is_file() {
            let mut file = File::open(entry.path())?;
            writer.write_entry(header, &mut file)?;
        } else {
            // Directories and special file kinds carry metadata only
            header.method = CompressionMethod::Stored;
            writer.write_entry(header, &mut std::io::empty())?;
        }
        count += 1;
    }

    writer.finish()?;
    Ok(count)
}
