use crate::snapshot::reader::Snapshot;
use crate::snapshot::source::{FileSource, SnapshotSource};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stop collecting undecodable items after this many
const MAX_REPORTED_ERRORS: usize = 10;

/// Result of a full walk over a snapshot
#[derive(Debug, Default)]
pub struct VerifyReport {
    pub items: usize,
    /// First index whose name sorts before its predecessor
    pub order_violation: Option<usize>,
    /// Items that failed to decode, with the reason
    pub bad_items: Vec<(usize, String)>,
    /// Cached top lists not sorted by points descending
    pub unsorted_prefixes: Vec<String>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.order_violation.is_none()
            && self.bad_items.is_empty()
            && self.unsorted_prefixes.is_empty()
    }
}

/// Check everything loading deliberately skips: name order, item encoding,
/// and the ordering of the embedded top lists
pub fn verify(snapshot: &Snapshot) -> VerifyReport {
    let mut report = VerifyReport {
        items: snapshot.num_items(),
        ..Default::default()
    };

    match snapshot.names().verify_order() {
        Ok(violation) => report.order_violation = violation,
        Err(e) => report.bad_items.push((0, e.to_string())),
    }

    for index in 0..snapshot.num_items() {
        if report.bad_items.len() >= MAX_REPORTED_ERRORS {
            break;
        }
        if let Err(e) = snapshot.read_item(index) {
            report.bad_items.push((index, e.to_string()));
        }
    }

    let cache = snapshot.prefix_cache();
    for prefix in cache.prefixes() {
        let prefix = String::from_utf8_lossy(prefix).into_owned();
        if let Some(top) = cache.get(&prefix)
            && top.windows(2).any(|w| w[0].points < w[1].points)
        {
            report.unsorted_prefixes.push(prefix);
        }
    }
    report.unsorted_prefixes.sort();

    report
}

fn open(path: &Path, use_mmap: bool) -> Result<Snapshot> {
    let source = FileSource::new(path).with_mmap(use_mmap);
    let modified = source
        .modified()
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let bytes = source
        .read()
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Snapshot::parse(bytes, modified).context("Failed to parse snapshot")
}

/// Display snapshot statistics
pub fn show_stats(path: &Path, use_mmap: bool) -> Result<()> {
    let snapshot = open(path, use_mmap)?;

    println!("Snapshot Statistics");
    println!("===================");
    println!();
    println!("File:             {}", path.display());
    println!("Format version:   {}", snapshot.version());
    println!("Players:          {}", snapshot.num_items());
    println!("Cached prefixes:  {}", snapshot.prefix_cache().len());
    println!("Size:             {}", format_size(snapshot.byte_len() as u64));
    println!("Cache offset:     {}", snapshot.cache_pointer());
    println!("Modified:         {}", format_timestamp(snapshot.source_modified()));

    Ok(())
}

/// Walk the snapshot and print any problems found.
/// Returns whether the snapshot is clean.
pub fn run_verify(path: &Path, use_mmap: bool) -> Result<bool> {
    let snapshot = open(path, use_mmap)?;
    let report = verify(&snapshot);

    println!("Checked {} players", report.items);

    if let Some(index) = report.order_violation {
        println!(
            "  name order broken at index {} ({:?})",
            index,
            snapshot.names().name(index).unwrap_or("<unreadable>")
        );
    }
    for (index, reason) in &report.bad_items {
        println!("  item {}: {}", index, reason);
    }
    for prefix in &report.unsorted_prefixes {
        println!("  cached top list for {:?} is not sorted by points", prefix);
    }

    if report.is_ok() {
        println!("OK");
    }

    Ok(report.is_ok())
}

/// Format byte size to human readable
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a file time as seconds since the epoch
fn format_timestamp(time: SystemTime) -> String {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => format!("{} (unix)", d.as_secs()),
        Err(_) => format!("{:?}", time),
    }
}
