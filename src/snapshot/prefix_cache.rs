//! Precomputed top lists embedded at the end of a snapshot.

use crate::error::Result;
use crate::snapshot::types::PointsEntry;
use crate::utils::encoding::{read_len_prefixed_str, read_u32_le, read_u8, read_varint_u32};
use ahash::AHashMap;

/// Top-by-points lists keyed by the exact (case-preserved) prefix bytes
#[derive(Debug, Default)]
pub struct PrefixCache {
    entries: AHashMap<Box<[u8]>, Vec<PointsEntry>>,
}

impl PrefixCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the cache section starting at `cache_pointer`
    pub fn parse(bytes: &[u8], cache_pointer: usize) -> Result<Self> {
        let (count, mut pos) = read_u32_le(bytes, cache_pointer)?;

        // Every entry needs at least two bytes; don't trust the count for capacity
        let mut entries = AHashMap::with_capacity((count as usize).min(bytes.len() / 2));

        for _ in 0..count {
            let (prefix, next) = read_len_prefixed_str(bytes, pos)?;
            let (top_count, next) = read_u8(bytes, next)?;
            pos = next;

            let mut top = Vec::with_capacity(top_count as usize);
            for _ in 0..top_count {
                let (name, next) = read_len_prefixed_str(bytes, pos)?;
                let (points, next) = read_varint_u32(bytes, next)?;
                pos = next;
                top.push(PointsEntry::new(name, points));
            }

            entries.insert(prefix.as_bytes().into(), top);
        }

        Ok(Self { entries })
    }

    /// Cached top list for exactly this prefix
    pub fn get(&self, prefix: &str) -> Option<&[PointsEntry]> {
        self.entries.get(prefix.as_bytes()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(|k| k.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::{encode_varint, write_u32_le};

    fn section(entries: &[(&str, &[(&str, u32)])]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, entries.len() as u32);
        for (prefix, top) in entries {
            buf.push(prefix.len() as u8);
            buf.extend_from_slice(prefix.as_bytes());
            buf.push(top.len() as u8);
            for (name, points) in *top {
                buf.push(name.len() as u8);
                buf.extend_from_slice(name.as_bytes());
                encode_varint(*points, &mut buf);
            }
        }
        buf
    }

    #[test]
    fn test_parse_and_get() {
        let mut bytes = vec![0xEE; 7];
        bytes.extend(section(&[
            ("al", &[("alice", 90), ("albert", 70)]),
            ("Bo", &[("bob", 300)]),
        ]));

        let cache = PrefixCache::parse(&bytes, 7).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.get("al").unwrap(),
            &[PointsEntry::new("alice", 90), PointsEntry::new("albert", 70)]
        );
        assert_eq!(cache.get("Bo").unwrap(), &[PointsEntry::new("bob", 300)]);
        // Keys keep their original case
        assert!(cache.get("bo").is_none());
        assert!(cache.get("x").is_none());
    }

    #[test]
    fn test_empty_section() {
        let cache = PrefixCache::parse(&section(&[]), 0).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_truncated_section_is_corrupt() {
        let bytes = section(&[("al", &[("alice", 90)])]);
        assert!(PrefixCache::parse(&bytes[..bytes.len() - 1], 0).is_err());
        assert!(PrefixCache::parse(&bytes, bytes.len()).is_err());
    }
}
