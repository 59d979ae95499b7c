//! Reorg detection and rollback orchestration.
//!
//! Adapted from the indexer's own reorg-handling module: the core idea —
//! compare the safe tip against the stored cursor and, on divergence, issue
//! one rollback that deletes orphaned history and rewinds the checkpoint —
//! carries over unchanged. What's different here is *what* gets rewound: a
//! balance ledger re-derived from surviving `BalanceChange` rows, rather
//! than a table of raw decoded events.

use tracing::warn;

use crate::db::Store;
use crate::error::Result;
use crate::metrics::indexing as metrics;

/// Whether the chain's safe tip requires a rollback before forward progress
/// can resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorgCheck {
    /// No reorg: `safe_tip >= last_block`.
    None,
    /// A reorg was detected; roll the chain back to this block.
    RollbackTo(u64),
}

/// Compares the freshly polled safe tip against the chain's stored cursor.
pub fn check_for_reorg(last_block: i64, safe_tip: u64) -> ReorgCheck {
    if (safe_tip as i64) < last_block {
        ReorgCheck::RollbackTo(safe_tip)
    } else {
        ReorgCheck::None
    }
}

/// Execute the rollback transaction and log it the way the source's reorg
/// handler does: one warning naming the chain and the block it rewound to.
pub async fn handle_reorg(
    store: &Store,
    chain_id: u64,
    chain_name: &str,
    current_last_block: i64,
    safe_block: u64,
) -> Result<()> {
    let depth = current_last_block.saturating_sub(safe_block as i64).max(0) as u64;
    warn!(
        chain = chain_name,
        chain_id,
        from_block = current_last_block,
        safe_block,
        "reorg detected: rolling back ledger"
    );
    metrics::record_reorg(chain_name, depth);
    store.rollback_to_safe_block(chain_id, safe_block).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_reorg_when_safe_tip_has_not_receded() {
        assert_eq!(check_for_reorg(100, 100), ReorgCheck::None);
        assert_eq!(check_for_reorg(100, 105), ReorgCheck::None);
    }

    #[test]
    fn reorg_when_safe_tip_recedes_past_last_block() {
        assert_eq!(check_for_reorg(13, 12), ReorgCheck::RollbackTo(12));
    }

    #[test]
    fn handles_negative_initial_last_block() {
        // start_block = 0 gives last_block = -1 before any ingestion.
        assert_eq!(check_for_reorg(-1, 0), ReorgCheck::None);
    }
}
