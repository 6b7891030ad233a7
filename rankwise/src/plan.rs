//! Partitioning of a workload into contiguous per-rank blocks.

use crate::Error;
use std::ops::Range;

/// How a workload of `chunk_size * offsets.len()` elements is split over a
/// group: rank r owns the block starting at `offsets[r]`.
///
/// Blocks are contiguous, non-overlapping, and rank-ordered; the aggregator
/// relies on that ordering to reassemble results without carrying offset
/// metadata through the gather.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    chunk_size: usize,
    offsets: Vec<usize>,
}

impl PartitionPlan {
    /// Split `total_len` elements evenly over `group_size` ranks.
    ///
    /// `total_len % group_size != 0` is rejected with
    /// [`Error::IndivisibleWorkload`] rather than padded or truncated.
    pub fn new(total_len: usize, group_size: usize) -> Result<Self, Error> {
        if group_size == 0 || total_len % group_size != 0 {
            return Err(Error::IndivisibleWorkload {
                total_len,
                group_size,
            });
        }
        let chunk_size = total_len / group_size;
        let offsets = (0..group_size).map(|r| r * chunk_size).collect();
        Ok(Self { chunk_size, offsets })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn group_size(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// The element range owned by `rank`.
    pub fn range(&self, rank: u32) -> Range<usize> {
        let start = self.offsets[rank as usize];
        start..start + self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_cover_workload_in_rank_order() {
        let plan = PartitionPlan::new(48, 4).unwrap();
        assert_eq!(plan.chunk_size(), 12);
        assert_eq!(plan.chunk_size() * plan.group_size(), 48);
        assert_eq!(plan.offsets(), &[0, 12, 24, 36]);

        let mut next = 0;
        for r in 0..4 {
            let range = plan.range(r);
            assert_eq!(range.start, next);
            next = range.end;
        }
        assert_eq!(next, 48);
    }

    #[test]
    fn single_rank_owns_everything() {
        let plan = PartitionPlan::new(10, 1).unwrap();
        assert_eq!(plan.range(0), 0..10);
    }

    #[test]
    fn indivisible_workload_is_rejected() {
        let err = PartitionPlan::new(47, 4).unwrap_err();
        assert!(matches!(
            err,
            Error::IndivisibleWorkload {
                total_len: 47,
                group_size: 4
            }
        ));
    }

    #[test]
    fn empty_group_is_rejected() {
        assert!(PartitionPlan::new(8, 0).is_err());
    }
}
