//! In-process counters, logged rather than exported — there is no metrics
//! endpoint in this binary, only the same `tracing` sink everything else uses.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

pub mod indexing {
    use super::*;

    static REORGS: AtomicU64 = AtomicU64::new(0);
    static BLOCKS_INGESTED: AtomicU64 = AtomicU64::new(0);
    static CHANGES_APPLIED: AtomicU64 = AtomicU64::new(0);

    pub fn record_reorg(chain: &str, depth: u64) {
        let total = REORGS.fetch_add(1, Ordering::Relaxed) + 1;
        info!(chain, depth, total_reorgs = total, "reorg recorded");
    }

    pub fn record_blocks_ingested(chain: &str, count: u64) {
        let total = BLOCKS_INGESTED.fetch_add(count, Ordering::Relaxed) + count;
        info!(chain, count, total_blocks = total, "blocks ingested");
    }

    pub fn record_changes_applied(chain: &str, count: u64) {
        CHANGES_APPLIED.fetch_add(count, Ordering::Relaxed);
        info!(chain, count, "balance changes applied");
    }
}

pub mod points {
    use super::*;

    static USERS_AWARDED: AtomicU64 = AtomicU64::new(0);

    pub fn record_award(chain_id: u64, contract_id: i64) {
        let total = USERS_AWARDED.fetch_add(1, Ordering::Relaxed) + 1;
        info!(chain_id, contract_id, total_awards = total, "points awarded");
    }
}
