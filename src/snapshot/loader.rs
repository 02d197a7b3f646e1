//! Snapshot refresh protocol.
//!
//! ```text
//! Query threads (N)                    Loader (at most 1 at a time)
//!   |                                    |
//!   +-- refresh()                        +-- stat source, compare mtime
//!   |     throttled?  -> return          +-- read + parse
//!   |     loading?    -> wait on condvar +-- current.store(new)
//!   |     otherwise   -> become loader   +-- notify_all
//!   |
//!   +-- current()  (lock-free load of the published Arc)
//! ```
//!
//! The published snapshot is only ever replaced, never mutated. A failed
//! load leaves it untouched, so readers keep the last good data.

use crate::error::Result;
use crate::snapshot::reader::Snapshot;
use crate::snapshot::source::{FileSource, SnapshotSource};
use crate::utils::app_data::AppConfig;
use arc_swap::ArcSwapOption;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Where the loader is in its refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadPhase {
    Idle,
    Loading,
    Ready,
    Failed,
}

struct LoadState {
    phase: LoadPhase,
    last_check: Option<Instant>,
    /// Bumped every time a load finishes; waiters watch it to ignore spurious wakeups
    completed: u64,
}

#[derive(Default)]
struct Counters {
    checks: AtomicU64,
    parses: AtomicU64,
    failures: AtomicU64,
    unchanged: AtomicU64,
}

/// Point-in-time copy of the loader's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderStats {
    /// Times the source's modification time was checked
    pub checks: u64,
    /// Times a full snapshot was read and parsed
    pub parses: u64,
    /// Loads that ended in an error
    pub failures: u64,
    /// Checks that found the source unchanged
    pub unchanged: u64,
}

/// Owns the published snapshot and keeps it fresh
pub struct SnapshotLoader {
    source: Box<dyn SnapshotSource>,
    refresh_interval: Duration,
    current: ArcSwapOption<Snapshot>,
    state: Mutex<LoadState>,
    finished: Condvar,
    counters: Counters,
}

impl SnapshotLoader {
    pub fn new(source: impl SnapshotSource + 'static, refresh_interval: Duration) -> Self {
        Self {
            source: Box::new(source),
            refresh_interval,
            current: ArcSwapOption::empty(),
            state: Mutex::new(LoadState {
                phase: LoadPhase::Idle,
                last_check: None,
                completed: 0,
            }),
            finished: Condvar::new(),
            counters: Counters::default(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let source = FileSource::new(&config.snapshot_path).with_mmap(config.use_mmap);
        Self::new(source, config.refresh_interval())
    }

    /// Currently published snapshot, if any load has ever succeeded
    #[inline]
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    pub fn phase(&self) -> LoadPhase {
        self.lock_state().phase
    }

    pub fn source(&self) -> &dyn SnapshotSource {
        self.source.as_ref()
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            checks: self.counters.checks.load(Ordering::Relaxed),
            parses: self.counters.parses.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            unchanged: self.counters.unchanged.load(Ordering::Relaxed),
        }
    }

    /// Make sure the published snapshot is reasonably fresh.
    ///
    /// Returns immediately when a snapshot is published and the last check
    /// is younger than the refresh interval. If another thread is loading,
    /// blocks until that load finishes instead of starting a second one.
    pub fn refresh(&self) {
        self.refresh_inner(true);
    }

    /// Like [`refresh`](Self::refresh) but ignores the refresh interval
    pub fn refresh_now(&self) {
        self.refresh_inner(false);
    }

    fn lock_state(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh_inner(&self, throttle: bool) {
        let mut state = self.lock_state();

        if throttle
            && self.current.load().is_some()
            && state
                .last_check
                .is_some_and(|checked| checked.elapsed() < self.refresh_interval)
        {
            return;
        }

        if state.phase == LoadPhase::Loading {
            let ticket = state.completed;
            while state.completed == ticket {
                state = self
                    .finished
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            return;
        }

        state.phase = LoadPhase::Loading;
        state.last_check = Some(Instant::now());
        drop(state);

        // Finishes the transition and wakes waiters even if the load unwinds
        let mut guard = LoadGuard {
            loader: self,
            outcome: LoadPhase::Failed,
        };

        guard.outcome = match self.load() {
            Ok(()) => LoadPhase::Ready,
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                let kept = if self.current.load().is_some() {
                    "keeping previous snapshot"
                } else {
                    "no snapshot available yet"
                };
                warn!(source = %self.source.describe(), error = %e, "snapshot load failed, {}", kept);
                LoadPhase::Failed
            }
        };
    }

    fn load(&self) -> Result<()> {
        self.counters.checks.fetch_add(1, Ordering::Relaxed);
        let modified = self.source.modified()?;

        let current = self.current.load();
        if let Some(snapshot) = current.as_deref()
            && snapshot.source_modified() == modified
        {
            self.counters.unchanged.fetch_add(1, Ordering::Relaxed);
            debug!(source = %self.source.describe(), "snapshot unchanged");
            return Ok(());
        }
        drop(current);

        let bytes = self.source.read()?;
        self.counters.parses.fetch_add(1, Ordering::Relaxed);
        let snapshot = Snapshot::parse(bytes, modified)?;

        info!(
            source = %self.source.describe(),
            items = snapshot.num_items(),
            cached_prefixes = snapshot.prefix_cache().len(),
            bytes = snapshot.byte_len(),
            "published snapshot"
        );
        self.current.store(Some(Arc::new(snapshot)));
        Ok(())
    }
}

struct LoadGuard<'a> {
    loader: &'a SnapshotLoader,
    outcome: LoadPhase,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.loader.lock_state();
        state.phase = self.outcome;
        state.completed += 1;
        drop(state);
        self.loader.finished.notify_all();
    }
}
