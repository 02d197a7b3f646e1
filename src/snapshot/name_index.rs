//! Case-insensitive binary search over the snapshot's name offset table.
//!
//! The table holds `num_items` little-endian u32 offsets starting at byte 16,
//! each pointing at an item whose length-prefixed name comes first. Names are
//! stored as written by the generator and ordered by their lower-cased UTF-8
//! bytes, so every comparison folds the on-disk name before comparing it with
//! an already-folded target.

use crate::error::Result;
use crate::snapshot::types::{fold_name, NAME_TABLE_OFFSET};
use crate::utils::encoding::{read_len_prefixed_str, read_u32_le};
use std::cmp::Ordering;
use std::ops::Range;

/// Borrowed view over a snapshot buffer's name table
#[derive(Clone, Copy)]
pub struct NameIndex<'a> {
    bytes: &'a [u8],
    num_items: usize,
}

impl<'a> NameIndex<'a> {
    pub fn new(bytes: &'a [u8], num_items: usize) -> Self {
        Self { bytes, num_items }
    }

    pub fn len(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// Byte offset of the item at `index`
    pub fn item_offset(&self, index: usize) -> Result<usize> {
        let (offset, _) = read_u32_le(self.bytes, NAME_TABLE_OFFSET + index * 4)?;
        Ok(offset as usize)
    }

    /// Stored (original-case) name of the item at `index`
    pub fn name(&self, index: usize) -> Result<&'a str> {
        let (name, _) = read_len_prefixed_str(self.bytes, self.item_offset(index)?)?;
        Ok(name)
    }

    /// Compare the folded name at `index` against a folded target
    fn compare(&self, index: usize, target: &[u8]) -> Result<Ordering> {
        let name = self.name(index)?;
        if name.is_ascii() {
            Ok(name
                .bytes()
                .map(|b| b.to_ascii_lowercase())
                .cmp(target.iter().copied()))
        } else {
            Ok(fold_name(name).as_bytes().cmp(target))
        }
    }

    /// First index whose folded name is >= `target`
    fn lower_bound(&self, target: &[u8]) -> Result<usize> {
        let mut start = 0;
        let mut end = self.num_items;
        while start < end {
            let mid = start + (end - start) / 2;
            if self.compare(mid, target)? == Ordering::Less {
                start = mid + 1;
            } else {
                end = mid;
            }
        }
        Ok(start)
    }

    /// First index whose folded name equals `target`
    pub fn exact_match(&self, target: &[u8]) -> Result<Option<usize>> {
        let index = self.lower_bound(target)?;
        if index < self.num_items && self.compare(index, target)? == Ordering::Equal {
            Ok(Some(index))
        } else {
            Ok(None)
        }
    }

    /// Contiguous index range of all names starting with `prefix`
    pub fn range_for_prefix(&self, prefix: &[u8]) -> Result<Range<usize>> {
        let start = self.lower_bound(prefix)?;
        let end = match successor(prefix) {
            Some(next) => self.lower_bound(&next)?,
            None => self.num_items,
        };
        Ok(start..end.max(start))
    }

    /// Walk the whole table and return the first index whose name sorts
    /// before its predecessor, if any
    pub fn verify_order(&self) -> Result<Option<usize>> {
        let mut previous: Option<String> = None;
        for index in 0..self.num_items {
            let folded = fold_name(self.name(index)?);
            if let Some(prev) = &previous
                && prev.as_bytes() > folded.as_bytes()
            {
                return Ok(Some(index));
            }
            previous = Some(folded);
        }
        Ok(None)
    }
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Trailing 0xFF bytes cannot be incremented and are dropped before the
/// increment, so `"a\xFF"` gives `"b"`, not `"b\x00"`. That is the tighter
/// bound: a name exactly equal to `"b"` sorts below `"b\x00"` and would
/// otherwise land inside the range. Returns `None` when every byte is 0xFF
/// (or the prefix is empty): no upper bound exists and the range runs to the
/// end of the table.
pub fn successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut next = prefix.to_vec();
    while let Some(last) = next.pop() {
        if last != 0xFF {
            next.push(last + 1);
            return Some(next);
        }
    }
    None
}
