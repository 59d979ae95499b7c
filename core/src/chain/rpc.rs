//! JSON-RPC `ChainClient` backed by an `alloy` HTTP provider.

use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::Filter;
use async_trait::async_trait;
use std::str::FromStr;

use crate::chain::{ChainClient, Log};
use crate::error::Error;

pub struct AlloyChainClient {
    provider: Box<dyn Provider + Send + Sync>,
}

impl AlloyChainClient {
    pub fn new(rpc_url: &str) -> Result<Self, Error> {
        let url = rpc_url
            .parse()
            .map_err(|e| Error::Config(format!("invalid rpc_url {rpc_url:?}: {e}")))?;
        let provider = ProviderBuilder::new().connect_http(url);
        Ok(Self {
            provider: Box::new(provider),
        })
    }
}

#[async_trait]
impl ChainClient for AlloyChainClient {
    async fn get_head(&self) -> Result<u64, Error> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| Error::Rpc(format!("eth_blockNumber: {e}")))
    }

    async fn filter_logs(
        &self,
        from: u64,
        to: u64,
        address: &str,
        topic0: &str,
    ) -> Result<Vec<Log>, Error> {
        let address = Address::from_str(address)
            .map_err(|e| Error::Config(format!("invalid contract address {address:?}: {e}")))?;
        let topic0_hash = topic0
            .strip_prefix("0x")
            .unwrap_or(topic0)
            .parse::<alloy::primitives::B256>()
            .map_err(|e| Error::Config(format!("invalid topic0 {topic0:?}: {e}")))?;

        let filter = Filter::new()
            .address(address)
            .from_block(from)
            .to_block(to)
            .event_signature(topic0_hash);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(|e| Error::Rpc(format!("eth_getLogs({from}..={to}): {e}")))?;

        logs.into_iter().map(convert_log).collect()
    }
}

fn convert_log(log: alloy::rpc::types::Log) -> Result<Log, Error> {
    let tx_hash = log
        .transaction_hash
        .ok_or_else(|| Error::Decode("log missing transaction_hash".to_string()))?;
    let block_number = log
        .block_number
        .ok_or_else(|| Error::Decode("log missing block_number".to_string()))?;
    let log_index = log
        .log_index
        .ok_or_else(|| Error::Decode("log missing log_index".to_string()))?;

    let topics = log
        .inner
        .topics()
        .iter()
        .map(|t| format!("0x{}", hex::encode(t.as_slice())))
        .collect();

    Ok(Log {
        tx_hash: format!("0x{}", hex::encode(tx_hash.as_slice())),
        block_number,
        log_index,
        topics,
        data: format!("0x{}", hex::encode(log.inner.data.data.as_ref())),
    })
}
