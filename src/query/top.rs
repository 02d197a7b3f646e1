//! Bounded list of players ordered by points.
//!
//! Small enough (k = 10) that a sorted `Vec` with linear insertion beats a
//! heap. Among equal points the most recently inserted entry comes first, so
//! once the list is full an equal newcomer pushes the oldest one out.

use crate::snapshot::types::PointsEntry;

#[derive(Debug, Clone)]
pub struct TopList {
    entries: Vec<PointsEntry>,
    capacity: usize,
}

impl TopList {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Start from an already-ordered list, e.g. a cached one
    pub fn from_sorted(entries: &[PointsEntry], capacity: usize) -> Self {
        let mut list = Self::new(capacity);
        list.entries
            .extend(entries.iter().take(capacity).cloned());
        list
    }

    /// Check if `points` could enter the list
    #[inline]
    pub fn would_enter(&self, points: u32) -> bool {
        self.entries.len() < self.capacity
            || self.entries.last().is_some_and(|last| points >= last.points)
    }

    /// Insert keeping points descending, ahead of any equal entries.
    /// Returns true if the entry was kept.
    pub fn try_insert(&mut self, entry: PointsEntry) -> bool {
        if !self.would_enter(entry.points) {
            return false;
        }
        let pos = self
            .entries
            .iter()
            .position(|e| e.points <= entry.points)
            .unwrap_or(self.entries.len());
        self.entries.insert(pos, entry);
        self.entries.truncate(self.capacity);
        true
    }

    /// Put `entry` first regardless of points, drop its other occurrence,
    /// and trim back to capacity
    pub fn promote(&mut self, entry: PointsEntry) {
        if let Some(pos) = self.entries.iter().position(|e| e.name == entry.name) {
            self.entries.remove(pos);
        }
        self.entries.insert(0, entry);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[PointsEntry] {
        &self.entries
    }

    pub fn into_vec(self) -> Vec<PointsEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &TopList) -> Vec<&str> {
        list.as_slice().iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_insert_orders_by_points() {
        let mut list = TopList::new(3);
        assert!(list.try_insert(PointsEntry::new("a", 10)));
        assert!(list.try_insert(PointsEntry::new("b", 30)));
        assert!(list.try_insert(PointsEntry::new("c", 20)));
        assert_eq!(names(&list), ["b", "c", "a"]);

        // Below the current minimum
        assert!(!list.try_insert(PointsEntry::new("d", 9)));
        assert!(list.try_insert(PointsEntry::new("e", 25)));
        assert_eq!(names(&list), ["b", "e", "c"]);
    }

    #[test]
    fn test_ties_put_latest_first() {
        let mut list = TopList::new(10);
        for name in ["x", "y", "z"] {
            list.try_insert(PointsEntry::new(name, 5));
        }
        assert_eq!(names(&list), ["z", "y", "x"]);

        // Ahead of equal points, still behind higher ones
        list.try_insert(PointsEntry::new("high", 9));
        list.try_insert(PointsEntry::new("w", 5));
        assert_eq!(names(&list), ["high", "w", "z", "y", "x"]);
    }

    #[test]
    fn test_full_list_tie_evicts_oldest() {
        let mut list = TopList::new(3);
        for name in ["a", "b", "c"] {
            assert!(list.try_insert(PointsEntry::new(name, 5)));
        }
        assert!(list.would_enter(5));
        assert!(!list.would_enter(4));

        assert!(list.try_insert(PointsEntry::new("d", 5)));
        assert_eq!(names(&list), ["d", "c", "b"]);
    }

    #[test]
    fn test_promote_dedups_and_truncates() {
        let cached = vec![
            PointsEntry::new("alice", 90),
            PointsEntry::new("albert", 70),
        ];
        let mut list = TopList::from_sorted(&cached, 10);
        list.promote(PointsEntry::new("al", 50));
        assert_eq!(
            list.as_slice(),
            &[
                PointsEntry::new("al", 50),
                PointsEntry::new("alice", 90),
                PointsEntry::new("albert", 70),
            ]
        );

        // Already present further down: moved, not duplicated
        list.promote(PointsEntry::new("albert", 70));
        assert_eq!(names(&list), ["albert", "al", "alice"]);

        let mut full = TopList::new(2);
        full.try_insert(PointsEntry::new("a", 2));
        full.try_insert(PointsEntry::new("b", 1));
        full.promote(PointsEntry::new("c", 0));
        assert_eq!(names(&full), ["c", "a"]);
    }
}
