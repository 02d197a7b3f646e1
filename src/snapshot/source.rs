//! Where snapshot bytes come from.
//!
//! The loader only needs two things from the outside world: the current
//! modification time and the full contents. Keeping that behind a trait lets
//! tests drive the refresh protocol without racing real file writes.

use crate::snapshot::reader::SnapshotBytes;
use memmap2::Mmap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Trait for reading a snapshot and checking its freshness
pub trait SnapshotSource: Send + Sync {
    /// Human-readable location, for logs
    fn describe(&self) -> String;

    /// Modification time of the current snapshot
    fn modified(&self) -> io::Result<SystemTime>;

    /// Read the whole snapshot
    fn read(&self) -> io::Result<SnapshotBytes>;
}

/// Snapshot file on the local file system
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    use_mmap: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_mmap: false,
        }
    }

    /// Map the file instead of copying it into memory
    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn modified(&self) -> io::Result<SystemTime> {
        fs::metadata(&self.path)?.modified()
    }

    fn read(&self) -> io::Result<SnapshotBytes> {
        if self.use_mmap {
            let file = File::open(&self.path)?;
            // SAFETY: the generator publishes by rename, so the mapped inode is
            // never truncated or rewritten while we hold it
            let map = unsafe { Mmap::map(&file)? };
            Ok(SnapshotBytes::Mapped(map))
        } else {
            Ok(SnapshotBytes::Owned(fs::read(&self.path)?))
        }
    }
}
