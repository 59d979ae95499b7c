//! The point calculator: a singleton periodic process.
//!
//! Runs once per `calculation_interval`, independently of every ingestor.
//! Its view of the ledger is a best-effort snapshot taken at the moment each
//! per-user transaction runs — there is no synchronization with ingestors.

use std::collections::BTreeSet;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::Store;
use crate::error::Result;
use crate::metrics::points as metrics;
use crate::points::window::{integrate_window, WindowChange};

pub struct Calculator {
    store: Store,
    chain_ids: Vec<u64>,
    interval: Duration,
}

impl Calculator {
    pub fn new(store: Store, chain_ids: Vec<u64>, calculation_interval_minutes: u64) -> Self {
        Self {
            store,
            chain_ids,
            interval: Duration::minutes(calculation_interval_minutes.max(1) as i64),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let std_interval =
            StdDuration::from_secs((self.interval.num_seconds().max(1)) as u64);
        let mut ticker = tokio::time::interval(std_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            calculation_interval_minutes = self.interval.num_minutes(),
            "point calculator starting"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("point calculator shutting down");
                    return;
                }
                _ = ticker.tick() => {}
            }

            // The window boundary is derived from wall clock on every tick,
            // not from a persisted cursor.
            let window_end = Utc::now();
            let window_start = window_end - self.interval;

            if let Err(e) = self.run_window(window_start, window_end).await {
                error!(err = %e, "point calculation window failed");
            }
        }
    }

    async fn run_window(&self, window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Result<()> {
        for &chain_id in &self.chain_ids {
            let contract_ids = self.store.contract_ids_for_chain(chain_id).await?;
            for contract_id in contract_ids {
                if let Err(e) = self
                    .run_window_for_contract(chain_id, contract_id, window_start, window_end)
                    .await
                {
                    warn!(chain_id, contract_id, err = %e, "window failed for contract, continuing");
                }
            }
        }
        Ok(())
    }

    async fn run_window_for_contract(
        &self,
        chain_id: u64,
        contract_id: i64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<()> {
        let changed = self
            .store
            .users_changed_in_window(chain_id, contract_id, window_start, window_end)
            .await?;
        let carried = self.store.balances_for_contract(chain_id, contract_id).await?;

        let mut users: BTreeSet<String> = changed.into_iter().collect();
        users.extend(carried.into_iter().map(|b| b.user_addr));

        for user_addr in users {
            self.award_one_user(chain_id, contract_id, &user_addr, window_start, window_end)
                .await?;
        }
        Ok(())
    }

    async fn award_one_user(
        &self,
        chain_id: u64,
        contract_id: i64,
        user_addr: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<()> {
        let start_balance = self
            .store
            .balance_at(chain_id, contract_id, user_addr, window_start)
            .await?;
        let changes = self
            .store
            .changes_in_window(chain_id, contract_id, user_addr, window_start, window_end)
            .await?
            .into_iter()
            .map(|row| WindowChange {
                created_at: row.created_at,
                balance_after: row.balance_after,
            })
            .collect::<Vec<_>>();

        let total = integrate_window(&start_balance, &changes, window_start, window_end);

        if !total.is_positive() {
            // Zero (or non-positive) window: no row is written.
            debug!(chain_id, contract_id, user = %user_addr, "no points this window");
            return Ok(());
        }

        self.store
            .award_points(chain_id, contract_id, user_addr, window_start, window_end, &total)
            .await?;
        metrics::record_award(chain_id, contract_id);
        debug!(chain_id, contract_id, user = %user_addr, points = %total, "points awarded");
        Ok(())
    }
}
