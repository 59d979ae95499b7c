//! Typed rows returned by the Store. No caller outside `db` sees a raw
//! `tokio_postgres::Row`.

use crate::bigint::Amount;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRow {
    pub id: i64,
    pub last_block: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractRow {
    pub id: i64,
    pub chain_id: i64,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct BalanceChangeRow {
    pub id: i64,
    pub chain_id: i64,
    pub contract_id: i64,
    pub user_addr: String,
    pub amount: Amount,
    pub balance_after: Amount,
    pub tx_hash: String,
    pub block_number: i64,
    pub log_index: i64,
    pub event_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct UserBalanceRow {
    pub chain_id: i64,
    pub contract_id: i64,
    pub user_addr: String,
    pub balance: Amount,
}

/// One parsed Transfer event ready to be applied to the Ledger.
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub user_addr: String,
    pub delta: Amount,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    pub event_type: &'static str,
}
