use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};
use crate::zip::{ZipEntry, ZipReader};

/// Unpack every entry of `src_archive` under `dest_dir`.
///
/// Each entry's name is resolved against `dest_dir` and rejected with
/// [`Error::PathTraversal`] before anything is written if it would land
/// outside; the first rejection aborts the remaining entries. Directory
/// entries (and missing parents of file entries) are created as needed;
/// file entries are created/truncated with the entry's stored permission
/// bits and filled with the decompressed payload, whose CRC-32 is verified
/// at end of stream.
///
/// Returns the number of entries materialized.
pub fn unpack(dest_dir: &Path, src_archive: &Path) -> Result<u64> {
    let reader = ZipReader::open(src_archive)?;
    let mut count = 0u64;

    for entry in reader.entries() {
        let target = resolve_entry_path(dest_dir, entry)?;

        log::debug!("extracting '{}' -> {}", entry.name, target.display());

        if entry.is_directory() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }

            let mut options = fs::OpenOptions::new();
            options.write(true).create(true).truncate(true);
            #[cfg(unix)]
            {
                use std::os::unix::fs::OpenOptionsExt;
                options.mode(entry.permissions());
            }

            let mut file = options.open(&target)?;
            let mut payload = reader.entry_reader(entry)?;
            io::copy(&mut payload, &mut file).map_err(|e| payload_error(entry, e))?;
        }
        count += 1;
    }

    Ok(count)
}

/// A failed payload read means a bad archive, not a bad filesystem, when
/// the stream flagged its own data as invalid.
fn payload_error(entry: &ZipEntry, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::InvalidData || e.kind() == io::ErrorKind::UnexpectedEof {
        Error::Corrupt(format!("entry '{}': {}", entry.name, e))
    } else {
        Error::Io(e)
    }
}

/// Resolve an entry name under the destination root, refusing escapes.
///
/// Normalization is purely lexical: `.` components drop, `..` pops, and
/// popping past the root or an absolute name rejects the entry.
fn resolve_entry_path(dest_dir: &Path, entry: &ZipEntry) -> Result<PathBuf> {
    let mut parts = Vec::new();
    for component in Path::new(&entry.name).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(Error::PathTraversal(entry.name.clone()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(Error::PathTraversal(entry.name.clone()));
            }
        }
    }

    let mut resolved = dest_dir.to_path_buf();
    for part in parts {
        resolved.push(part);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_named(name: &str) -> ZipEntry {
        ZipEntry::new(name)
    }

    #[test]
    fn plain_names_resolve_under_the_destination() {
        let dest = Path::new("/out");
        let resolved = resolve_entry_path(dest, &entry_named("a/b.txt")).unwrap();
        assert_eq!(resolved, PathBuf::from("/out/a/b.txt"));
    }

    #[test]
    fn interior_dot_dot_stays_contained() {
        let dest = Path::new("/out");
        let resolved = resolve_entry_path(dest, &entry_named("a/../b.txt")).unwrap();
        assert_eq!(resolved, PathBuf::from("/out/b.txt"));
    }

    #[test]
    fn escaping_names_are_rejected() {
        let dest = Path::new("/out");
        for name in ["../evil", "a/../../evil", "/etc/passwd"] {
            match resolve_entry_path(dest, &entry_named(name)) {
                Err(Error::PathTraversal(n)) => assert_eq!(n, name),
                other => panic!("expected PathTraversal for {name:?}, got {other:?}"),
            }
        }
    }
}
