//! Ledger mutations: applying a batch of parsed Transfer deltas, and rolling
//! a chain back to a safe block after a reorg. Both run as single database
//! transactions so a crash mid-batch never leaves the ledger half-applied.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::bigint::Amount;
use crate::chain::events::is_zero_address;
use crate::db::models::{PendingChange, UserBalanceRow};
use crate::db::Store;
use crate::error::{Error, Result};

impl Store {
    /// Apply one ingestion window's changes and advance `last_block` in the
    /// same transaction, so a crash between the two can never happen.
    /// `changes` must already be sorted ascending by `(block_number, log_index)`.
    pub async fn apply_ingestion_batch(
        &self,
        chain_id: u64,
        contract_id: i64,
        changes: &[PendingChange],
        new_last_block: u64,
    ) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        for change in changes {
            if is_zero_address(&change.user_addr) {
                // The mint/burn sentinel is never a ledger user.
                continue;
            }
            apply_one_change(&tx, chain_id, contract_id, change).await?;
        }

        Store::set_last_block(&tx, chain_id, new_last_block).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Roll a chain back to `safe_block`: delete all BalanceChange rows past
    /// it, re-derive UserBalance for every touched `(contract, user)` pair,
    /// and move `last_block` backwards. One transaction.
    pub async fn rollback_to_safe_block(&self, chain_id: u64, safe_block: u64) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let touched = tx
            .query(
                "SELECT DISTINCT contract_id, user_addr FROM balance_change \
                 WHERE chain_id = $1 AND block_number > $2",
                &[&(chain_id as i64), &(safe_block as i64)],
            )
            .await?;

        let touched: BTreeSet<(i64, String)> = touched
            .into_iter()
            .map(|row| (row.get::<_, i64>(0), row.get::<_, String>(1)))
            .collect();

        tx.execute(
            "DELETE FROM balance_change WHERE chain_id = $1 AND block_number > $2",
            &[&(chain_id as i64), &(safe_block as i64)],
        )
        .await?;

        for (contract_id, user_addr) in &touched {
            let surviving = tx
                .query_opt(
                    "SELECT amount, balance_after FROM balance_change \
                     WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3 \
                     ORDER BY block_number DESC, log_index DESC LIMIT 1",
                    &[&(chain_id as i64), contract_id, user_addr],
                )
                .await?;

            match surviving {
                Some(row) => {
                    let amount = Amount::parse_decimal(&row.get::<_, String>(0))?;
                    let balance_after = Amount::parse_decimal(&row.get::<_, String>(1))?;

                    // I1: the surviving latest change's balance_after must equal
                    // the balance before it plus its own delta. A mismatch means
                    // the history itself is corrupt, not just stale.
                    let prior = tx
                        .query_opt(
                            "SELECT balance_after FROM balance_change \
                             WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3 \
                             ORDER BY block_number DESC, log_index DESC OFFSET 1 LIMIT 1",
                            &[&(chain_id as i64), contract_id, user_addr],
                        )
                        .await?;
                    let prior_balance = match prior {
                        Some(row) => Amount::parse_decimal(&row.get::<_, String>(0))?,
                        None => Amount::zero(),
                    };
                    let expected = &prior_balance + &amount;
                    if expected != balance_after {
                        return Err(Error::Invariant(format!(
                            "I1 violation rederiving balance for chain {chain_id} contract {contract_id} user {user_addr}: \
                             expected balance_after {expected}, found {balance_after}"
                        )));
                    }

                    tx.execute(
                        "INSERT INTO user_balance (chain_id, contract_id, user_addr, balance) \
                         VALUES ($1, $2, $3, $4) \
                         ON CONFLICT (chain_id, contract_id, user_addr) \
                         DO UPDATE SET balance = EXCLUDED.balance",
                        &[&(chain_id as i64), contract_id, user_addr, &balance_after.to_string()],
                    )
                    .await?;
                }
                None => {
                    tx.execute(
                        "DELETE FROM user_balance \
                         WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3",
                        &[&(chain_id as i64), contract_id, user_addr],
                    )
                    .await?;
                }
            }
        }

        crate::db::Store::set_last_block(&tx, chain_id, safe_block).await?;

        tx.commit().await?;
        warn!(chain_id, safe_block, touched = touched.len(), "reorg rollback complete");
        Ok(())
    }

    pub async fn get_user_balance(
        &self,
        chain_id: u64,
        contract_id: i64,
        user_addr: &str,
    ) -> Result<Amount> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT balance FROM user_balance WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3",
                &[&(chain_id as i64), &contract_id, &user_addr],
            )
            .await?;
        match row {
            Some(row) => Amount::parse_decimal(&row.get::<_, String>(0)),
            None => Ok(Amount::zero()),
        }
    }

    /// All UserBalance rows for a given contract, whatever their value —
    /// callers that need "held through the window" (U_carry) get zero-balance
    /// rows filtered out downstream by the points formula instead of here.
    pub async fn balances_for_contract(
        &self,
        chain_id: u64,
        contract_id: i64,
    ) -> Result<Vec<UserBalanceRow>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT chain_id, contract_id, user_addr, balance FROM user_balance \
                 WHERE chain_id = $1 AND contract_id = $2",
                &[&(chain_id as i64), &contract_id],
            )
            .await?;
        rows.into_iter()
            .map(|row| {
                Ok(UserBalanceRow {
                    chain_id: row.get(0),
                    contract_id: row.get(1),
                    user_addr: row.get(2),
                    balance: Amount::parse_decimal(&row.get::<_, String>(3))?,
                })
            })
            .collect()
    }

    /// All contract ids that have ever had a balance or a change recorded, for a chain.
    pub async fn contract_ids_for_chain(&self, chain_id: u64) -> Result<Vec<i64>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT id FROM contract WHERE chain_id = $1",
                &[&(chain_id as i64)],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }
}

async fn apply_one_change(
    tx: &deadpool_postgres::Transaction<'_>,
    chain_id: u64,
    contract_id: i64,
    change: &PendingChange,
) -> Result<()> {
    let current = tx
        .query_opt(
            "SELECT balance FROM user_balance WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3 FOR UPDATE",
            &[&(chain_id as i64), &contract_id, &change.user_addr],
        )
        .await?;

    let current_balance = match &current {
        Some(row) => Amount::parse_decimal(&row.get::<_, String>(0))?,
        None => Amount::zero(),
    };
    let new_balance = &current_balance + &change.delta;

    let inserted = tx
        .query_opt(
            "INSERT INTO balance_change \
             (chain_id, contract_id, user_addr, amount, balance_after, tx_hash, block_number, log_index, event_type) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (chain_id, tx_hash, log_index, user_addr) DO NOTHING \
             RETURNING id",
            &[
                &(chain_id as i64),
                &contract_id,
                &change.user_addr,
                &change.delta.to_string(),
                &new_balance.to_string(),
                &change.tx_hash,
                &(change.block_number as i64),
                &(change.log_index as i64),
                &change.event_type,
            ],
        )
        .await?;

    if inserted.is_none() {
        // Idempotent replay: this log+user was already applied. Do not
        // re-apply the delta to UserBalance a second time.
        debug!(
            chain_id,
            contract_id,
            user = %change.user_addr,
            tx_hash = %change.tx_hash,
            log_index = change.log_index,
            "balance change already applied, skipping"
        );
        return Ok(());
    }

    tx.execute(
        "INSERT INTO user_balance (chain_id, contract_id, user_addr, balance) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (chain_id, contract_id, user_addr) \
         DO UPDATE SET balance = EXCLUDED.balance",
        &[
            &(chain_id as i64),
            &contract_id,
            &change.user_addr,
            &new_balance.to_string(),
        ],
    )
    .await?;

    Ok(())
}
