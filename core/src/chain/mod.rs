//! Chain Client: the collaborator interface the Ingestor consumes.
//!
//! Kept deliberately narrow — `get_head` and `filter_logs` — so the Ingestor
//! never needs to know whether it's talking to a JSON-RPC node, a cache, or
//! (in tests) a fixture.

pub mod events;
pub mod rpc;

use async_trait::async_trait;

use crate::error::Result;

/// One ERC-20 Transfer log, already narrowed to the fields the Ingestor needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
    /// `topics[0..3]`, hex-encoded with a leading `0x`. Transfer always has exactly 3.
    pub topics: Vec<String>,
    /// ABI-encoded event data, hex-encoded with a leading `0x`.
    pub data: String,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// The current chain head as observed by this client's node.
    async fn get_head(&self) -> Result<u64>;

    /// Logs matching `address` and `topic0` in `[from, to]` inclusive.
    async fn filter_logs(
        &self,
        from: u64,
        to: u64,
        address: &str,
        topic0: &str,
    ) -> Result<Vec<Log>>;
}

pub use rpc::AlloyChainClient;
