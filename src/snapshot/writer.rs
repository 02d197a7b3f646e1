//! Produces files in the snapshot format.
//!
//! The production generator is a separate program; this writer exists for
//! fixtures, benchmarks and local tooling. Output is sorted the same way the
//! reader expects: by lower-cased name bytes, stable for equal keys.

use crate::snapshot::types::*;
use crate::utils::encoding::{encode_varint, write_u32_le};
use std::fs;
use std::io;
use std::path::Path;

/// Longest name or prefix representable with a 1-byte length
const MAX_STRING_LEN: usize = u8::MAX as usize;

#[derive(Debug, Default)]
pub struct SnapshotWriter {
    version: Option<u32>,
    players: Vec<(String, [CategoryRank; CATEGORY_COUNT])>,
    prefixes: Vec<(String, Vec<PointsEntry>)>,
}

impl SnapshotWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the header version (used to produce incompatible files)
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Add a player with its six (points, rank) pairs in file order
    pub fn add_player(&mut self, name: &str, pairs: [(u32, u32); CATEGORY_COUNT]) -> &mut Self {
        let pairs = pairs.map(|(points, rank)| CategoryRank { points, rank });
        self.players.push((clamp(name).to_string(), pairs));
        self
    }

    /// Add a precomputed top list; only the first ten entries are kept
    pub fn add_prefix(&mut self, prefix: &str, mut top: Vec<PointsEntry>) -> &mut Self {
        top.truncate(TOP_LIMIT);
        for entry in &mut top {
            entry.name = clamp(&entry.name).to_string();
        }
        self.prefixes.push((clamp(prefix).to_string(), top));
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut order: Vec<(String, usize)> = self
            .players
            .iter()
            .enumerate()
            .map(|(i, (name, _))| (fold_name(name), i))
            .collect();
        order.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let mut items = Vec::new();
        let mut offsets = Vec::with_capacity(order.len());
        let items_start = NAME_TABLE_OFFSET + order.len() * 4;

        for (_, i) in &order {
            let (name, pairs) = &self.players[*i];
            offsets.push((items_start + items.len()) as u32);
            write_str(&mut items, name);
            for pair in pairs {
                encode_varint(pair.points, &mut items);
                encode_varint(pair.rank, &mut items);
            }
        }

        let cache_pointer = (items_start + items.len()) as u32;

        let mut buf = Vec::with_capacity(cache_pointer as usize + 64);
        write_u32_le(&mut buf, self.version.unwrap_or(SUPPORTED_VERSION));
        let total: u64 = self.players.iter().map(|(_, p)| p[0].points as u64).sum();
        write_u32_le(&mut buf, total.min(i32::MAX as u64) as u32);
        write_u32_le(&mut buf, order.len() as u32);
        write_u32_le(&mut buf, cache_pointer);
        for offset in offsets {
            write_u32_le(&mut buf, offset);
        }
        buf.extend_from_slice(&items);

        write_u32_le(&mut buf, self.prefixes.len() as u32);
        for (prefix, top) in &self.prefixes {
            write_str(&mut buf, prefix);
            buf.push(top.len() as u8);
            for entry in top {
                write_str(&mut buf, &entry.name);
                encode_varint(entry.points, &mut buf);
            }
        }

        buf
    }

    /// Write to a temporary sibling and rename over `path`, the way the
    /// generator publishes new snapshots
    pub fn write_atomic(&self, path: &Path) -> io::Result<()> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        fs::write(&tmp, self.to_bytes())?;
        fs::rename(&tmp, path)
    }
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.push(s.len() as u8);
    buf.extend_from_slice(s.as_bytes());
}

/// Cut a string to at most 255 bytes on a char boundary
fn clamp(s: &str) -> &str {
    if s.len() <= MAX_STRING_LEN {
        return s;
    }
    let mut end = MAX_STRING_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
