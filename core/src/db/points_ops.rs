//! Queries and mutations backing the point calculator.

use chrono::{DateTime, Utc};

use crate::bigint::Amount;
use crate::db::models::BalanceChangeRow;
use crate::db::Store;
use crate::error::Result;

impl Store {
    /// Distinct users with at least one BalanceChange in `[window_start, window_end]`.
    pub async fn users_changed_in_window(
        &self,
        chain_id: u64,
        contract_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT DISTINCT user_addr FROM balance_change \
                 WHERE chain_id = $1 AND contract_id = $2 \
                   AND created_at >= $3 AND created_at <= $4",
                &[&(chain_id as i64), &contract_id, &window_start, &window_end],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.get(0)).collect())
    }

    /// The user's balance at `period_start`: the `balance_after` of the
    /// latest BalanceChange with `created_at <= period_start`, or zero.
    pub async fn balance_at(
        &self,
        chain_id: u64,
        contract_id: i64,
        user_addr: &str,
        period_start: DateTime<Utc>,
    ) -> Result<Amount> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT balance_after FROM balance_change \
                 WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3 AND created_at <= $4 \
                 ORDER BY created_at DESC, block_number DESC, log_index DESC LIMIT 1",
                &[&(chain_id as i64), &contract_id, &user_addr, &period_start],
            )
            .await?;
        match row {
            Some(row) => Amount::parse_decimal(&row.get::<_, String>(0)),
            None => Ok(Amount::zero()),
        }
    }

    /// Changes for one user within `(period_start, period_end]`, ascending `created_at`.
    pub async fn changes_in_window(
        &self,
        chain_id: u64,
        contract_id: i64,
        user_addr: &str,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
    ) -> Result<Vec<BalanceChangeRow>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT id, chain_id, contract_id, user_addr, amount, balance_after, tx_hash, \
                        block_number, log_index, event_type, created_at \
                 FROM balance_change \
                 WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3 \
                   AND created_at > $4 AND created_at <= $5 \
                 ORDER BY created_at ASC, block_number ASC, log_index ASC",
                &[&(chain_id as i64), &contract_id, &user_addr, &period_start, &period_end],
            )
            .await?;

        rows.into_iter()
            .map(|row| {
                Ok(BalanceChangeRow {
                    id: row.get(0),
                    chain_id: row.get(1),
                    contract_id: row.get(2),
                    user_addr: row.get(3),
                    amount: Amount::parse_decimal(&row.get::<_, String>(4))?,
                    balance_after: Amount::parse_decimal(&row.get::<_, String>(5))?,
                    tx_hash: row.get(6),
                    block_number: row.get(7),
                    log_index: row.get(8),
                    event_type: row.get(9),
                    created_at: row.get(10),
                })
            })
            .collect()
    }

    /// Upsert the cumulative points total and append the audit row, in one
    /// transaction. Caller has already filtered out `total <= 0`.
    pub async fn award_points(
        &self,
        chain_id: u64,
        contract_id: i64,
        user_addr: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        points_added: &Amount,
    ) -> Result<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await?;

        let current = tx
            .query_opt(
                "SELECT points FROM user_points WHERE chain_id = $1 AND contract_id = $2 AND user_addr = $3",
                &[&(chain_id as i64), &contract_id, &user_addr],
            )
            .await?;
        let current_points = match current {
            Some(row) => Amount::parse_decimal(&row.get::<_, String>(0))?,
            None => Amount::zero(),
        };
        let new_total = &current_points + points_added;

        tx.execute(
            "INSERT INTO user_points (chain_id, contract_id, user_addr, points) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (chain_id, contract_id, user_addr) \
             DO UPDATE SET points = EXCLUDED.points",
            &[&(chain_id as i64), &contract_id, &user_addr, &new_total.to_string()],
        )
        .await?;

        tx.execute(
            "INSERT INTO points_calculation \
             (chain_id, contract_id, user_addr, window_start, window_end, points_added) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &(chain_id as i64),
                &contract_id,
                &user_addr,
                &window_start,
                &window_end,
                &points_added.to_string(),
            ],
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
