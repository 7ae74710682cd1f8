//! Round-trip integration tests: pack a directory tree, unpack it again,
//! and compare paths, contents and permissions.

use std::fs;
use std::path::Path;

use rezip::{DeflateLevel, Error, ZipEntry, ZipReader, ZipWriter, ops};

fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn round_trip_preserves_paths_and_contents() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let archive = tmp.path().join("tree.zip");
    let dest = tmp.path().join("out");

    let binary: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    write_file(&src.join("top.txt"), b"top level");
    write_file(&src.join("data/blob.bin"), &binary);
    write_file(&src.join("x/y/z/deep.txt"), b"deeply nested");
    fs::create_dir_all(src.join("empty")).unwrap();

    ops::pack(&src, &archive, DeflateLevel::Default).unwrap();
    ops::unpack(&dest, &archive).unwrap();

    assert_eq!(fs::read(dest.join("top.txt")).unwrap(), b"top level");
    assert_eq!(fs::read(dest.join("data/blob.bin")).unwrap(), binary);
    assert_eq!(fs::read(dest.join("x/y/z/deep.txt")).unwrap(), b"deeply nested");
    assert!(dest.join("empty").is_dir());
}

#[test]
fn packed_tree_lists_expected_entries() {
    // A file `a/b.txt` ("hi") and an empty directory `a/c/`
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let archive = tmp.path().join("small.zip");

    write_file(&src.join("a/b.txt"), b"hi");
    fs::create_dir_all(src.join("a/c")).unwrap();

    ops::pack(&src, &archive, DeflateLevel::Best).unwrap();

    let reader = ZipReader::open(&archive).unwrap();
    let file = reader
        .entries()
        .iter()
        .find(|e| e.name == "a/b.txt")
        .expect("file entry missing");
    assert_eq!(file.uncompressed_size, 2);

    let dir = reader
        .entries()
        .iter()
        .find(|e| e.name == "a/c/")
        .expect("directory entry missing");
    assert!(dir.is_directory());
    assert_eq!(dir.compressed_size, 0);
    assert_eq!(dir.uncompressed_size, 0);

    // And the tree comes back identically
    let dest = tmp.path().join("out");
    ops::unpack(&dest, &archive).unwrap();
    assert_eq!(fs::read(dest.join("a/b.txt")).unwrap(), b"hi");
    assert!(dest.join("a/c").is_dir());
    assert_eq!(fs::read_dir(dest.join("a/c")).unwrap().count(), 0);
}

#[cfg(unix)]
#[test]
fn round_trip_preserves_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let archive = tmp.path().join("perm.zip");
    let dest = tmp.path().join("out");

    write_file(&src.join("script.sh"), b"#!/bin/sh\n");
    write_file(&src.join("secret.txt"), b"private");
    fs::set_permissions(src.join("script.sh"), fs::Permissions::from_mode(0o700)).unwrap();
    fs::set_permissions(src.join("secret.txt"), fs::Permissions::from_mode(0o600)).unwrap();

    ops::pack(&src, &archive, DeflateLevel::Fastest).unwrap();
    ops::unpack(&dest, &archive).unwrap();

    let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode(&dest.join("script.sh")), 0o700);
    assert_eq!(mode(&dest.join("secret.txt")), 0o600);
}

#[cfg(unix)]
#[test]
fn special_entries_are_metadata_only() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    let archive = tmp.path().join("links.zip");

    write_file(&src.join("real.txt"), b"pointed at");
    std::os::unix::fs::symlink("real.txt", src.join("link")).unwrap();

    ops::pack(&src, &archive, DeflateLevel::Default).unwrap();

    let reader = ZipReader::open(&archive).unwrap();
    let link = reader
        .entries()
        .iter()
        .find(|e| e.name == "link")
        .expect("symlink entry missing");
    assert_eq!(link.compressed_size, 0);
    assert_eq!(link.uncompressed_size, 0);
    // File-type bits mark this as a symlink, payload or not
    assert_eq!(link.unix_mode.unwrap() & 0o170000, 0o120000);
}

#[test]
fn traversal_entries_abort_extraction() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("evil.zip");
    let dest = tmp.path().join("jail").join("out");

    // An archive whose middle entry climbs out of the destination. Entry
    // names are not validated at creation time, only at extraction.
    let mut writer = ZipWriter::create(&archive, DeflateLevel::Default).unwrap();
    writer
        .write_entry(ZipEntry::new("good.txt"), &mut &b"fine"[..])
        .unwrap();
    writer
        .write_entry(ZipEntry::new("../../escaped.txt"), &mut &b"bad"[..])
        .unwrap();
    writer
        .write_entry(ZipEntry::new("after.txt"), &mut &b"never written"[..])
        .unwrap();
    writer.finish().unwrap();

    match ops::unpack(&dest, &archive) {
        Err(Error::PathTraversal(name)) => assert_eq!(name, "../../escaped.txt"),
        other => panic!("expected PathTraversal, got {other:?}"),
    }

    // The offending entry wrote nothing, nor did anything after it
    assert!(!tmp.path().join("escaped.txt").exists());
    assert!(!tmp.path().join("jail/escaped.txt").exists());
    assert!(!dest.join("after.txt").exists());
    // Entries before the rejection were already materialized
    assert_eq!(fs::read(dest.join("good.txt")).unwrap(), b"fine");
}

#[test]
fn missing_archive_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    match ops::unpack(&tmp.path().join("out"), &tmp.path().join("nope.zip")) {
        Err(Error::NotFound(path)) => assert!(path.ends_with("nope.zip")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn missing_source_dir_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    match ops::pack(
        &tmp.path().join("absent"),
        &tmp.path().join("out.zip"),
        DeflateLevel::Default,
    ) {
        Err(Error::NotFound(path)) => assert!(path.ends_with("absent")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[test]
fn corrupted_payload_fails_crc_verification() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("flip.zip");

    // Store the payload uncompressed so a bit flip leaves the deflate
    // framing (there is none) intact and only the checksum can object.
    let mut writer = ZipWriter::create(&archive, DeflateLevel::Default).unwrap();
    let mut header = ZipEntry::new("data.txt");
    header.method = rezip::CompressionMethod::Stored;
    writer
        .write_entry(header, &mut &b"stored without compression"[..])
        .unwrap();
    writer.finish().unwrap();

    let mut bytes = fs::read(&archive).unwrap();
    // Flip a byte inside the payload, which follows the 30-byte local
    // header and the 8-byte entry name.
    let payload_start = 30 + "data.txt".len();
    bytes[payload_start + 3] ^= 0xFF;
    fs::write(&archive, &bytes).unwrap();

    match ops::unpack(&tmp.path().join("out"), &archive) {
        Err(Error::Corrupt(reason)) => assert!(reason.contains("CRC"), "reason: {reason}"),
        other => panic!("expected Corrupt, got {other:?}"),
    }
}
