//! Arbiter statistics — monotonically increasing counters.
//!
//! Lock-free atomics so any task can sample them without touching the
//! cache or schedule mutexes. Reset only by constructing a new arbiter.

use core::sync::atomic::{AtomicU32, Ordering};

#[derive(Default)]
pub struct Stats {
    total_reads: AtomicU32,
    cache_hits: AtomicU32,
    cache_misses: AtomicU32,
    errors: AtomicU32,
    poll_cycles: AtomicU32,
}

/// Point-in-time copy for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_reads: u32,
    pub cache_hits: u32,
    pub cache_misses: u32,
    pub errors: u32,
    pub poll_cycles: u32,
}

impl Stats {
    pub const fn new() -> Self {
        Self {
            total_reads: AtomicU32::new(0),
            cache_hits: AtomicU32::new(0),
            cache_misses: AtomicU32::new(0),
            errors: AtomicU32::new(0),
            poll_cycles: AtomicU32::new(0),
        }
    }

    /// One hardware transaction attempted; `failed` also bumps the error
    /// counter (bus timeouts and adapter errors alike).
    pub fn record_read(&self, failed: bool) {
        self.total_reads.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Advance the cycle counter and return the new cycle number (first
    /// cycle is 1).
    pub fn next_cycle(&self) -> u32 {
        self.poll_cycles.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn cycle(&self) -> u32 {
        self.poll_cycles.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_reads: self.total_reads.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let stats = Stats::new();
        stats.record_read(false);
        stats.record_read(true);
        stats.record_hit();
        stats.record_miss();
        stats.record_miss();

        let snap = stats.snapshot();
        assert_eq!(snap.total_reads, 2);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.cache_hits, 1);
        assert_eq!(snap.cache_misses, 2);
    }

    #[test]
    fn cycles_start_at_one() {
        let stats = Stats::new();
        assert_eq!(stats.cycle(), 0);
        assert_eq!(stats.next_cycle(), 1);
        assert_eq!(stats.next_cycle(), 2);
        assert_eq!(stats.snapshot().poll_cycles, 2);
    }
}
