//! Rejection counters.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Rejection;

/// One counter per [`Rejection`] reason, shared by every load on a cache.
#[derive(Debug, Default)]
pub struct RejectionStats {
    counts: [AtomicU64; Rejection::ALL.len()],
}

impl RejectionStats {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one rejection.
    pub fn record(&self, reason: Rejection) {
        self.counts[reason.index()].fetch_add(1, Ordering::Relaxed);
    }

    /// Rejections recorded for `reason`.
    pub fn count(&self, reason: Rejection) -> u64 {
        self.counts[reason.index()].load(Ordering::Relaxed)
    }

    /// Rejections recorded for every reason.
    pub fn total(&self) -> u64 {
        Rejection::ALL.iter().map(|r| self.count(*r)).sum()
    }

    /// Non-zero counters, in check order.
    pub fn snapshot(&self) -> Vec<(Rejection, u64)> {
        Rejection::ALL
            .iter()
            .map(|r| (*r, self.count(*r)))
            .filter(|(_, n)| *n > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_reason() {
        let stats = RejectionStats::new();
        stats.record(Rejection::FlagsMismatch);
        stats.record(Rejection::FlagsMismatch);
        stats.record(Rejection::SourceMismatch);
        assert_eq!(stats.count(Rejection::FlagsMismatch), 2);
        assert_eq!(stats.count(Rejection::MagicMismatch), 0);
        assert_eq!(stats.total(), 3);
        assert_eq!(
            stats.snapshot(),
            vec![(Rejection::FlagsMismatch, 2), (Rejection::SourceMismatch, 1)]
        );
    }

    #[test]
    fn shared_across_threads() {
        let stats = std::sync::Arc::new(RejectionStats::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || stats.record(Rejection::ChecksumMismatch))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.count(Rejection::ChecksumMismatch), 4);
    }
}
