use std::sync::Arc;

use crate::core::ledger::PayoutRequestLedger;
use crate::types::PayoutStats;

/// Read-side view over the ledger's per-doctor accumulators. Counts and
/// sums are maintained incrementally on every commit, so this is O(1) per
/// call regardless of ledger size.
pub struct StatsAggregator {
    ledger: Arc<PayoutRequestLedger>,
}

impl StatsAggregator {
    pub fn new(ledger: Arc<PayoutRequestLedger>) -> Self {
        Self { ledger }
    }

    /// Summary for one doctor. Unknown doctors get all-zero stats rather
    /// than an error; an empty history is not a failure.
    pub async fn compute_stats(&self, doctor_id: &str) -> PayoutStats {
        self.ledger.stats_for(doctor_id).await
    }
}

#[cfg(test)]
#[path = "tests/stats_tests.rs"]
mod tests;
