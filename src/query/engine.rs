use crate::error::Result;
use crate::query::top::TopList;
use crate::snapshot::loader::SnapshotLoader;
use crate::snapshot::reader::Snapshot;
use crate::snapshot::types::{fold_name, PlayerRecord, PointsEntry, TOP_LIMIT};
use crate::utils::app_data::AppConfig;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Outcome of an exact player lookup
///
/// Serializes as `null` (no data loaded yet), `{"name": null}` (not found),
/// or the full record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<PlayerLookupRepr>", into = "Option<PlayerLookupRepr>")]
pub enum PlayerLookup {
    NoData,
    NotFound,
    Found(PlayerRecord),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PlayerLookupRepr {
    Found(PlayerRecord),
    NotFound { name: () },
}

impl From<Option<PlayerLookupRepr>> for PlayerLookup {
    fn from(repr: Option<PlayerLookupRepr>) -> Self {
        match repr {
            None => PlayerLookup::NoData,
            Some(PlayerLookupRepr::NotFound { .. }) => PlayerLookup::NotFound,
            Some(PlayerLookupRepr::Found(record)) => PlayerLookup::Found(record),
        }
    }
}

impl From<PlayerLookup> for Option<PlayerLookupRepr> {
    fn from(lookup: PlayerLookup) -> Self {
        match lookup {
            PlayerLookup::NoData => None,
            PlayerLookup::NotFound => Some(PlayerLookupRepr::NotFound { name: () }),
            PlayerLookup::Found(record) => Some(PlayerLookupRepr::Found(record)),
        }
    }
}

/// Exact match (if any) plus the best players sharing a prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixResult {
    pub player: Option<PlayerRecord>,
    pub top10: Vec<PointsEntry>,
}

/// Outcome of a prefix query; serializes as `null` when no data is loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<PrefixResult>", into = "Option<PrefixResult>")]
pub enum PrefixLookup {
    NoData,
    Found(PrefixResult),
}

impl From<Option<PrefixResult>> for PrefixLookup {
    fn from(result: Option<PrefixResult>) -> Self {
        result.map_or(PrefixLookup::NoData, PrefixLookup::Found)
    }
}

impl From<PrefixLookup> for Option<PrefixResult> {
    fn from(lookup: PrefixLookup) -> Self {
        match lookup {
            PrefixLookup::NoData => None,
            PrefixLookup::Found(result) => Some(result),
        }
    }
}

/// Public query surface over the current snapshot
///
/// Every query first gives the loader a chance to refresh, then runs
/// entirely against one published snapshot.
pub struct QueryEngine {
    loader: Arc<SnapshotLoader>,
    queries_served: AtomicU64,
}

impl QueryEngine {
    pub fn new(loader: Arc<SnapshotLoader>) -> Self {
        Self {
            loader,
            queries_served: AtomicU64::new(0),
        }
    }

    /// Engine over the snapshot file named in `config`
    pub fn open(config: &AppConfig) -> Self {
        Self::new(Arc::new(SnapshotLoader::from_config(config)))
    }

    pub fn loader(&self) -> &Arc<SnapshotLoader> {
        &self.loader
    }

    pub fn queries_served(&self) -> u64 {
        self.queries_served.load(Ordering::Relaxed)
    }

    fn fresh_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.queries_served.fetch_add(1, Ordering::Relaxed);
        self.loader.refresh();
        self.loader.current()
    }

    /// Look up a player by name, ignoring case
    pub fn get_player(&self, name: &str) -> PlayerLookup {
        let Some(snapshot) = self.fresh_snapshot() else {
            return PlayerLookup::NoData;
        };

        match find_player(&snapshot, name) {
            Ok(Some(record)) => PlayerLookup::Found(record),
            Ok(None) => PlayerLookup::NotFound,
            Err(e) => {
                warn!(player = name, error = %e, "player lookup hit corrupt data");
                PlayerLookup::NotFound
            }
        }
    }

    /// Find the exact player (if any) and the top ten players by points
    /// whose names start with `prefix`
    pub fn query_prefix(&self, prefix: &str) -> PrefixLookup {
        let Some(snapshot) = self.fresh_snapshot() else {
            return PrefixLookup::NoData;
        };

        match search_prefix(&snapshot, prefix) {
            Ok(result) => PrefixLookup::Found(result),
            Err(e) => {
                warn!(prefix, error = %e, "prefix query hit corrupt data");
                PrefixLookup::NoData
            }
        }
    }
}

/// Exact, case-insensitive lookup against one snapshot
pub fn find_player(snapshot: &Snapshot, name: &str) -> Result<Option<PlayerRecord>> {
    let folded = fold_name(name);
    snapshot
        .names()
        .exact_match(folded.as_bytes())?
        .map(|index| snapshot.read_item(index))
        .transpose()
}

/// Prefix query against one snapshot.
///
/// Uses the embedded top list when one exists for the exact prefix string,
/// otherwise scans every name in the prefix range decoding only overall
/// points. Either way the exact match, if present, is moved to the front.
pub fn search_prefix(snapshot: &Snapshot, prefix: &str) -> Result<PrefixResult> {
    let folded = fold_name(prefix);
    let names = snapshot.names();

    let (mut top, exact) = match snapshot.prefix_cache().get(prefix) {
        Some(cached) => (
            TopList::from_sorted(cached, TOP_LIMIT),
            names.exact_match(folded.as_bytes())?,
        ),
        None => {
            let range = names.range_for_prefix(folded.as_bytes())?;
            let first = range.start;
            let mut top = TopList::new(TOP_LIMIT);
            let mut exact = None;

            for index in range {
                let entry = snapshot.read_item_points(index)?;
                // A name equal to the prefix sorts first in its range
                if index == first && fold_name(&entry.name) == folded {
                    exact = Some(index);
                }
                top.try_insert(entry);
            }
            (top, exact)
        }
    };

    let player = match exact {
        Some(index) => {
            let record = snapshot.read_item(index)?;
            top.promote(record.points_entry());
            Some(record)
        }
        None => None,
    };

    Ok(PrefixResult {
        player,
        top10: top.into_vec(),
    })
}
