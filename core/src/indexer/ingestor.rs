//! Per-chain ingestion loop: advances `Chain.last_block` while keeping the
//! ledger consistent with the chain as observed through a `ChainClient`.

use std::time::Duration as StdDuration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::chain::events::{decode_transfer, is_zero_address, transfer_topic0};
use crate::chain::ChainClient;
use crate::db::models::PendingChange;
use crate::db::Store;
use crate::error::Result;
use crate::indexer::reorg::{check_for_reorg, handle_reorg, ReorgCheck};
use crate::metrics::indexing as metrics;

pub struct Ingestor {
    chain_id: u64,
    chain_name: String,
    contract_addr: String,
    client: Box<dyn ChainClient>,
    store: Store,
    reorg_threshold: u64,
    block_batch_size: u64,
    check_interval_seconds: u64,
}

impl Ingestor {
    pub fn new(
        chain_id: u64,
        chain_name: String,
        contract_addr: String,
        client: Box<dyn ChainClient>,
        store: Store,
        reorg_threshold: u64,
        block_batch_size: u64,
        check_interval_seconds: u64,
    ) -> Self {
        Self {
            chain_id,
            chain_name,
            contract_addr,
            client,
            store,
            reorg_threshold,
            block_batch_size,
            check_interval_seconds,
        }
    }

    pub async fn run(self, start_block: u64, shutdown: CancellationToken) {
        if let Err(e) = self.store.ensure_chain(self.chain_id, &self.chain_name, start_block).await {
            error!(chain = %self.chain_name, err = %e, "failed to initialize chain row, ingestor exiting");
            return;
        }
        let contract = match self.store.ensure_contract(self.chain_id, &self.contract_addr).await {
            Ok(c) => c,
            Err(e) => {
                error!(chain = %self.chain_name, err = %e, "failed to initialize contract row, ingestor exiting");
                return;
            }
        };

        let topic0 = transfer_topic0();
        let mut ticker = tokio::time::interval(StdDuration::from_secs(self.check_interval_seconds.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(chain = %self.chain_name, chain_id = self.chain_id, "ingestor starting");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(chain = %self.chain_name, "ingestor shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.tick(contract.id, &topic0).await {
                error!(chain = %self.chain_name, err = %e, "ingestion tick failed, retrying next interval");
            }
        }
    }

    async fn tick(&self, contract_id: i64, topic0: &str) -> Result<()> {
        let last_block = self.store.get_last_block(self.chain_id).await?;
        let head = self.client.get_head().await?;
        let safe = head.saturating_sub(self.reorg_threshold);

        match check_for_reorg(last_block, safe) {
            ReorgCheck::RollbackTo(safe_block) => {
                handle_reorg(&self.store, self.chain_id, &self.chain_name, last_block, safe_block).await?;
                return Ok(());
            }
            ReorgCheck::None => {}
        }

        if (safe as i64) <= last_block {
            return Ok(());
        }

        for (window_start, window_end) in batch_windows((last_block + 1) as u64, safe, self.block_batch_size) {
            self.process_window(contract_id, topic0, window_start, window_end).await?;
        }

        Ok(())
    }

    async fn process_window(
        &self,
        contract_id: i64,
        topic0: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<()> {
        let logs = self
            .client
            .filter_logs(from_block, to_block, &self.contract_addr, topic0)
            .await?;

        let mut changes = Vec::new();
        for log in &logs {
            let transfer = match decode_transfer(log) {
                Ok(t) => t,
                Err(e) => {
                    warn!(chain = %self.chain_name, err = %e, "skipping malformed transfer log");
                    continue;
                }
            };

            if !is_zero_address(&transfer.from) {
                changes.push(PendingChange {
                    user_addr: transfer.from.clone(),
                    delta: -&transfer.value,
                    tx_hash: transfer.tx_hash.clone(),
                    block_number: transfer.block_number,
                    log_index: transfer.log_index,
                    event_type: "transfer",
                });
            }
            if !is_zero_address(&transfer.to) {
                changes.push(PendingChange {
                    user_addr: transfer.to.clone(),
                    delta: transfer.value.clone(),
                    tx_hash: transfer.tx_hash,
                    block_number: transfer.block_number,
                    log_index: transfer.log_index,
                    event_type: "transfer",
                });
            }
        }

        changes.sort_by_key(|c| (c.block_number, c.log_index));

        self.store
            .apply_ingestion_batch(self.chain_id, contract_id, &changes, to_block)
            .await?;

        metrics::record_blocks_ingested(&self.chain_name, to_block - from_block + 1);
        metrics::record_changes_applied(&self.chain_name, changes.len() as u64);

        info!(
            chain = %self.chain_name,
            from_block,
            to_block,
            changes = changes.len(),
            "ingestion window applied"
        );
        Ok(())
    }
}

/// Split `[from, safe]` into ascending, contiguous, at-most-`batch_size`-wide windows.
fn batch_windows(from: u64, safe: u64, batch_size: u64) -> Vec<(u64, u64)> {
    let mut windows = Vec::new();
    let mut start = from;
    while start <= safe {
        let end = (start + batch_size - 1).min(safe);
        windows.push((start, end));
        start = end + 1;
    }
    windows
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_a_range_into_fixed_size_windows() {
        assert_eq!(
            batch_windows(1, 10, 4),
            vec![(1, 4), (5, 8), (9, 10)]
        );
    }

    #[test]
    fn single_window_when_range_fits_in_one_batch() {
        assert_eq!(batch_windows(100, 105, 2000), vec![(100, 105)]);
    }

    #[test]
    fn empty_when_from_exceeds_safe() {
        assert_eq!(batch_windows(11, 10, 4), Vec::<(u64, u64)>::new());
    }
}
