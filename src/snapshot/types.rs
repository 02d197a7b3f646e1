use serde::{Deserialize, Serialize};

/// Only snapshot format version this reader understands
pub const SUPPORTED_VERSION: u32 = 1;

/// version + legacy total + item count + cache pointer
pub const HEADER_SIZE: usize = 16;

/// Byte offset of the name offset table
pub const NAME_TABLE_OFFSET: usize = HEADER_SIZE;

/// Number of (points, rank) pairs stored per item
pub const CATEGORY_COUNT: usize = 6;

/// Maximum entries in a top list
pub const TOP_LIMIT: usize = 10;

/// Points and rank within one ranking category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryRank {
    pub points: u32,
    pub rank: u32,
}

/// Fully decoded player record
///
/// Field order mirrors the on-disk pair order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub name: String,
    /// Overall points
    pub points: CategoryRank,
    /// Individual rank points
    pub rank: CategoryRank,
    /// Team rank points
    pub team: CategoryRank,
    pub weekly: CategoryRank,
    pub monthly: CategoryRank,
    pub yearly: CategoryRank,
}

impl PlayerRecord {
    /// Build a record from the six pairs in file order
    pub fn from_pairs(name: String, pairs: [CategoryRank; CATEGORY_COUNT]) -> Self {
        let [points, rank, team, weekly, monthly, yearly] = pairs;
        Self {
            name,
            points,
            rank,
            team,
            weekly,
            monthly,
            yearly,
        }
    }

    /// The six pairs in file order
    pub fn pairs(&self) -> [CategoryRank; CATEGORY_COUNT] {
        [
            self.points,
            self.rank,
            self.team,
            self.weekly,
            self.monthly,
            self.yearly,
        ]
    }

    pub fn points_entry(&self) -> PointsEntry {
        PointsEntry {
            name: self.name.clone(),
            points: self.points.points,
        }
    }
}

/// Name and overall points, the unit of every top list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub name: String,
    pub points: u32,
}

impl PointsEntry {
    pub fn new(name: impl Into<String>, points: u32) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }
}

/// Case-fold a name the way the index is ordered
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_roundtrip_order() {
        let pairs = [
            CategoryRank { points: 1, rank: 2 },
            CategoryRank { points: 3, rank: 4 },
            CategoryRank { points: 5, rank: 6 },
            CategoryRank { points: 7, rank: 8 },
            CategoryRank { points: 9, rank: 10 },
            CategoryRank { points: 11, rank: 12 },
        ];
        let record = PlayerRecord::from_pairs("ana".to_string(), pairs);
        assert_eq!(record.points.points, 1);
        assert_eq!(record.yearly.rank, 12);
        assert_eq!(record.pairs(), pairs);
        assert_eq!(record.points_entry(), PointsEntry::new("ana", 1));
    }

    #[test]
    fn test_fold_name_unicode() {
        assert_eq!(fold_name("ANA"), "ana");
        assert_eq!(fold_name("ÄBC"), "äbc");
    }
}
