//! Main entry point for the rezip CLI application.
//!
//! This binary provides a command-line interface over the four archive
//! operations: pack, unpack, transcode and list.

use anyhow::Result;
use clap::Parser;
use std::collections::HashSet;
use std::path::Path;

use rezip::{Cli, Command, ZipReader, ops};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Command::Pack {
            src_dir,
            archive,
            level,
        } => {
            let count = ops::pack(src_dir, archive, (*level).into())?;
            if !cli.is_quiet() {
                println!("packed {} entries into {}", count, archive.display());
            }
        }

        Command::Unpack { archive, dest_dir } => {
            let count = ops::unpack(dest_dir, archive)?;
            if !cli.is_quiet() {
                println!("extracted {} entries into {}", count, dest_dir.display());
            }
        }

        Command::Transcode { src, dest, exclude } => {
            let exclude: HashSet<String> = exclude.iter().cloned().collect();
            let count = ops::transcode(src, dest, &exclude)?;
            if !cli.is_quiet() {
                println!("copied {} entries into {}", count, dest.display());
            }
        }

        Command::List { archive, verbose } => list_files(archive, *verbose)?,
    }

    Ok(())
}

/// List files in a ZIP archive.
///
/// Supports two output formats:
/// - Simple format: just file names, one per line
/// - Verbose format (`-v`): detailed table with size, compression ratio, and timestamps
fn list_files(archive: &Path, verbose: bool) -> Result<()> {
    let reader = ZipReader::open(archive)?;

    if verbose {
        // Print table header for verbose output
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
            "Length", "Size", "Cmpr", "Date", "Time"
        );
        println!("{}", "-".repeat(70));
    }

    // Track totals for summary line
    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in reader.entries() {
        if verbose {
            // Parse DOS timestamp into human-readable format
            let (year, month, day) = entry.mod_date();
            let (hour, minute, _second) = entry.mod_time();

            // Calculate compression ratio as percentage saved; incompressible
            // entries (stored larger than their content) show as 0%
            let ratio = if entry.uncompressed_size > 0 {
                format!(
                    "{:>4}%",
                    100u64.saturating_sub(entry.compressed_size * 100 / entry.uncompressed_size)
                )
            } else {
                "  0%".to_string()
            };

            // Print detailed entry information
            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {}",
                entry.uncompressed_size,
                entry.compressed_size,
                ratio,
                year,
                month,
                day,
                hour,
                minute,
                entry.name
            );

            // Accumulate totals (excluding directories)
            if !entry.is_directory() {
                total_uncompressed += entry.uncompressed_size;
                total_compressed += entry.compressed_size;
                file_count += 1;
            }
        } else {
            // Simple format: just the file name
            println!("{}", entry.name);
        }
    }

    // Print summary line in verbose mode
    if verbose {
        println!("{}", "-".repeat(70));
        let total_ratio = if total_uncompressed > 0 {
            format!(
                "{:>4}%",
                100u64.saturating_sub(total_compressed * 100 / total_uncompressed)
            )
        } else {
            "  0%".to_string()
        };
        println!(
            "{:>10}  {:>10}  {}  {:>21}  {} files",
            total_uncompressed, total_compressed, total_ratio, "", file_count
        );
        if !reader.comment().is_empty() {
            println!("Archive comment: {}", reader.comment());
        }
    }

    Ok(())
}
