//! Inclusive block ranges for batched backfill.

/// Inclusive `[from, to]` block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub from: u64,
    pub to: u64,
}

impl BlockRange {
    pub fn new(from: u64, to: u64) -> Self {
        Self { from, to }
    }

    /// Split `[from, to]` into ranges of at most `max_range` blocks. Empty when `from > to`.
    pub fn split(from: u64, to: u64, max_range: u64) -> Vec<BlockRange> {
        let max_range = max_range.max(1);
        let mut out = Vec::new();
        let mut start = from;
        while start <= to {
            let end = start.saturating_add(max_range - 1).min(to);
            out.push(BlockRange::new(start, end));
            if end == u64::MAX {
                break;
            }
            start = end + 1;
        }
        out
    }

    /// Number of blocks covered, saturating at `u64::MAX`; zero when `from > to`.
    pub fn len(&self) -> u64 {
        if self.from > self.to {
            return 0;
        }
        (self.to - self.from).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.from > self.to
    }
}
