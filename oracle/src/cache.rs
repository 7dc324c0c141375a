use crate::strategy::PriceStrategy;
use tracing::debug;

/// Last served recommendation and the countdown gating its recomputation.
///
/// The counter starts at zero so the first query always computes. The
/// ingestion worker decrements it once per block; a query that finds it at or
/// below zero recomputes and resets it to the flush interval. Recomputed
/// values are clamped to `[min_default, max_configured]` whatever the
/// strategy returns.
#[derive(Debug, Clone)]
pub struct RecommendationCache {
    value: u64,
    min_default: u64,
    max_configured: u64,
    flush_counter: i64,
    flush_interval: i64,
    recomputations: u64,
}

impl RecommendationCache {
    /// Starts out serving `min_default`
    pub fn new(min_default: u64, max_configured: u64, flush_interval: u32) -> Self {
        Self {
            value: min_default,
            min_default,
            max_configured: max_configured.max(min_default),
            flush_counter: 0,
            flush_interval: i64::from(flush_interval.max(1)),
            recomputations: 0,
        }
    }

    /// Record one ingested block
    pub fn mark_ingested(&mut self) {
        self.flush_counter = self.flush_counter.saturating_sub(1);
    }

    pub fn is_stale(&self) -> bool {
        self.flush_counter <= 0
    }

    /// Serve the cached value, recomputing from `strategy` first if stale
    pub fn get_or_recompute<S: PriceStrategy + ?Sized>(&mut self, strategy: &S) -> u64 {
        if self.is_stale() {
            let previous = self.value;
            self.value = strategy
                .compute_recommendation()
                .clamp(self.min_default, self.max_configured);
            self.flush_counter = self.flush_interval;
            self.recomputations += 1;

            if self.value != previous {
                debug!("Fee recommendation moved {} -> {}", previous, self.value);
            }
        }

        self.value
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn flush_counter(&self) -> i64 {
        self.flush_counter
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}
