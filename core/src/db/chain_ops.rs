//! Chain and Contract table operations.

use crate::db::models::{ChainRow, ContractRow};
use crate::db::Store;
use crate::error::Result;

impl Store {
    /// Create the Chain row on first start (`last_block = start_block - 1`),
    /// or return the existing one unchanged.
    pub async fn ensure_chain(&self, chain_id: u64, name: &str, start_block: u64) -> Result<ChainRow> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT id, last_block FROM chain WHERE id = $1",
                &[&(chain_id as i64)],
            )
            .await?;

        if let Some(row) = row {
            return Ok(ChainRow {
                id: row.get(0),
                last_block: row.get(1),
            });
        }

        let initial_last_block = (start_block as i64) - 1;
        client
            .execute(
                "INSERT INTO chain (id, name, last_block) VALUES ($1, $2, $3) \
                 ON CONFLICT (id) DO NOTHING",
                &[&(chain_id as i64), &name, &initial_last_block],
            )
            .await?;

        Ok(ChainRow {
            id: chain_id as i64,
            last_block: initial_last_block,
        })
    }

    pub async fn get_last_block(&self, chain_id: u64) -> Result<i64> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT last_block FROM chain WHERE id = $1",
                &[&(chain_id as i64)],
            )
            .await?;
        Ok(row.get(0))
    }

    /// Create the Contract row on first observation, or return the existing one.
    pub async fn ensure_contract(&self, chain_id: u64, address: &str) -> Result<ContractRow> {
        let client = self.client().await?;
        let address = address.to_lowercase();

        if let Some(row) = client
            .query_opt(
                "SELECT id, chain_id, address FROM contract WHERE chain_id = $1 AND address = $2",
                &[&(chain_id as i64), &address],
            )
            .await?
        {
            return Ok(ContractRow {
                id: row.get(0),
                chain_id: row.get(1),
                address: row.get(2),
            });
        }

        let row = client
            .query_one(
                "INSERT INTO contract (chain_id, address) VALUES ($1, $2) \
                 ON CONFLICT (chain_id, address) DO UPDATE SET address = EXCLUDED.address \
                 RETURNING id, chain_id, address",
                &[&(chain_id as i64), &address],
            )
            .await?;

        Ok(ContractRow {
            id: row.get(0),
            chain_id: row.get(1),
            address: row.get(2),
        })
    }

    /// Set `Chain.last_block` to an arbitrary value — used only by reorg rollback,
    /// which legitimately moves the cursor backwards.
    pub async fn set_last_block(
        tx: &deadpool_postgres::Transaction<'_>,
        chain_id: u64,
        last_block: u64,
    ) -> Result<()> {
        tx.execute(
            "UPDATE chain SET last_block = $2 WHERE id = $1",
            &[&(chain_id as i64), &(last_block as i64)],
        )
        .await?;
        Ok(())
    }
}
