use crate::error::{Result, SnapshotError};
use crate::snapshot::name_index::NameIndex;
use crate::snapshot::prefix_cache::PrefixCache;
use crate::snapshot::types::*;
use crate::utils::encoding::{read_len_prefixed_str, read_u32_le, read_varint_u32};
use memmap2::Mmap;
use std::ops::Deref;
use std::time::SystemTime;

/// Raw snapshot bytes, either read into memory or mapped read-only
pub enum SnapshotBytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl Deref for SnapshotBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            SnapshotBytes::Owned(v) => v,
            SnapshotBytes::Mapped(m) => m,
        }
    }
}

impl From<Vec<u8>> for SnapshotBytes {
    fn from(bytes: Vec<u8>) -> Self {
        SnapshotBytes::Owned(bytes)
    }
}

/// One immutable, parsed view of a snapshot file
///
/// Header fields and the prefix cache are decoded eagerly; items are decoded
/// on demand straight from the buffer.
pub struct Snapshot {
    bytes: SnapshotBytes,
    version: u32,
    num_items: u32,
    cache_pointer: u32,
    prefix_cache: PrefixCache,
    source_modified: SystemTime,
    loaded_at: SystemTime,
}

impl Snapshot {
    /// Validate the header and decode the prefix cache
    pub fn parse(bytes: impl Into<SnapshotBytes>, source_modified: SystemTime) -> Result<Self> {
        let bytes = bytes.into();

        if bytes.len() < HEADER_SIZE {
            return Err(SnapshotError::corrupt(format!(
                "file is {} bytes, header needs {}",
                bytes.len(),
                HEADER_SIZE
            )));
        }

        let (version, _) = read_u32_le(&bytes, 0)?;
        if version != SUPPORTED_VERSION {
            return Err(SnapshotError::VersionMismatch {
                expected: SUPPORTED_VERSION,
                actual: version,
            });
        }

        // Offset 4 holds a legacy total that is no longer used
        let (num_items, _) = read_u32_le(&bytes, 8)?;
        let (cache_pointer, _) = read_u32_le(&bytes, 12)?;

        let table_end = NAME_TABLE_OFFSET as u64 + num_items as u64 * 4;
        if table_end > bytes.len() as u64 {
            return Err(SnapshotError::corrupt(format!(
                "name table for {} items runs past end of {} byte file",
                num_items,
                bytes.len()
            )));
        }

        let prefix_cache = PrefixCache::parse(&bytes, cache_pointer as usize)?;

        Ok(Self {
            bytes,
            version,
            num_items,
            cache_pointer,
            prefix_cache,
            source_modified,
            loaded_at: SystemTime::now(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn num_items(&self) -> usize {
        self.num_items as usize
    }

    pub fn cache_pointer(&self) -> u32 {
        self.cache_pointer
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.bytes, SnapshotBytes::Mapped(_))
    }

    pub fn source_modified(&self) -> SystemTime {
        self.source_modified
    }

    pub fn loaded_at(&self) -> SystemTime {
        self.loaded_at
    }

    pub fn prefix_cache(&self) -> &PrefixCache {
        &self.prefix_cache
    }

    /// Name table view over this snapshot's buffer
    pub fn names(&self) -> NameIndex<'_> {
        NameIndex::new(&self.bytes, self.num_items as usize)
    }

    /// Decode the full record at `index`, all six categories
    pub fn read_item(&self, index: usize) -> Result<PlayerRecord> {
        let offset = self.names().item_offset(index)?;
        let (name, mut pos) = read_len_prefixed_str(&self.bytes, offset)?;

        let mut pairs = [CategoryRank::default(); CATEGORY_COUNT];
        for pair in pairs.iter_mut() {
            let (points, next) = read_varint_u32(&self.bytes, pos)?;
            let (rank, next) = read_varint_u32(&self.bytes, next)?;
            pos = next;
            *pair = CategoryRank { points, rank };
        }

        Ok(PlayerRecord::from_pairs(name.to_string(), pairs))
    }

    /// Decode only the name and overall points at `index`
    pub fn read_item_points(&self, index: usize) -> Result<PointsEntry> {
        let offset = self.names().item_offset(index)?;
        let (name, pos) = read_len_prefixed_str(&self.bytes, offset)?;
        let (points, _) = read_varint_u32(&self.bytes, pos)?;
        Ok(PointsEntry::new(name, points))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::writer::SnapshotWriter;

    fn two_players() -> Vec<u8> {
        let mut writer = SnapshotWriter::new();
        writer.add_player("ana", [(100, 1), (20, 2), (30, 3), (40, 4), (50, 5), (60, 6)]);
        writer.add_player("bob", [(50, 2), (0, 0), (0, 0), (0, 0), (0, 0), (0, 0)]);
        writer.add_prefix("a", vec![PointsEntry::new("ana", 100)]);
        writer.to_bytes()
    }

    #[test]
    fn test_parse_header() {
        let snapshot = Snapshot::parse(two_players(), SystemTime::UNIX_EPOCH).unwrap();
        assert_eq!(snapshot.version(), SUPPORTED_VERSION);
        assert_eq!(snapshot.num_items(), 2);
        assert_eq!(snapshot.prefix_cache().len(), 1);
        assert_eq!(snapshot.source_modified(), SystemTime::UNIX_EPOCH);
        assert!(!snapshot.is_mapped());
    }

    #[test]
    fn test_read_item_all_categories() {
        let snapshot = Snapshot::parse(two_players(), SystemTime::UNIX_EPOCH).unwrap();
        let ana = snapshot.read_item(0).unwrap();
        assert_eq!(ana.name, "ana");
        assert_eq!(ana.points, CategoryRank { points: 100, rank: 1 });
        assert_eq!(ana.rank, CategoryRank { points: 20, rank: 2 });
        assert_eq!(ana.team, CategoryRank { points: 30, rank: 3 });
        assert_eq!(ana.weekly, CategoryRank { points: 40, rank: 4 });
        assert_eq!(ana.monthly, CategoryRank { points: 50, rank: 5 });
        assert_eq!(ana.yearly, CategoryRank { points: 60, rank: 6 });

        assert_eq!(snapshot.read_item_points(1).unwrap(), PointsEntry::new("bob", 50));
    }

    #[test]
    fn test_reject_short_file() {
        let err = Snapshot::parse(vec![1, 0, 0], SystemTime::now()).err().unwrap();
        assert!(matches!(err, SnapshotError::CorruptData(_)));
    }

    #[test]
    fn test_reject_wrong_version() {
        let mut bytes = two_players();
        bytes[0..4].copy_from_slice(&2u32.to_le_bytes());
        let err = Snapshot::parse(bytes, SystemTime::now()).err().unwrap();
        assert!(matches!(
            err,
            SnapshotError::VersionMismatch { expected: 1, actual: 2 }
        ));
    }

    #[test]
    fn test_reject_oversized_item_count() {
        let mut bytes = two_players();
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(Snapshot::parse(bytes, SystemTime::now()).is_err());
    }

    #[test]
    fn test_reject_bad_cache_pointer() {
        let mut bytes = two_players();
        let len = bytes.len() as u32;
        bytes[12..16].copy_from_slice(&len.to_le_bytes());
        assert!(matches!(
            Snapshot::parse(bytes, SystemTime::now()),
            Err(SnapshotError::CorruptData(_))
        ));
    }

    #[test]
    fn test_truncated_item_is_error_not_panic() {
        let mut writer = SnapshotWriter::new();
        writer.add_player("ana", [(1, 1); 6]);
        let mut bytes = writer.to_bytes();
        // Point the only item at the final byte of the file
        let last = (bytes.len() - 1) as u32;
        bytes[16..20].copy_from_slice(&last.to_le_bytes());
        let snapshot = Snapshot::parse(bytes, SystemTime::now()).unwrap();
        assert!(snapshot.read_item(0).is_err());
        assert!(snapshot.read_item_points(0).is_err());
        assert!(snapshot.read_item(5).is_err());
    }
}
