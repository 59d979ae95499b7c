//! ERC-20 `Transfer(address,address,uint256)` decoding.
//!
//! The topic-0 filter is computed once from the event signature rather than
//! hard-coded, so it can never drift from the canonical hash.

use alloy::primitives::keccak256;

use crate::bigint::Amount;
use crate::chain::Log;
use crate::error::Error;

const TRANSFER_SIGNATURE: &str = "Transfer(address,address,uint256)";

pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// `keccak256("Transfer(address,address,uint256)")`, as `0x`-prefixed hex.
pub fn transfer_topic0() -> String {
    format!("0x{}", hex::encode(keccak256(TRANSFER_SIGNATURE.as_bytes())))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTransfer {
    pub from: String,
    pub to: String,
    pub value: Amount,
    pub tx_hash: String,
    pub block_number: u64,
    pub log_index: u64,
}

/// Decode one log as a Transfer event.
///
/// Malformed logs are a `Decode` error, not a panic — the Ingestor is
/// responsible for logging and skipping them without aborting the batch.
pub fn decode_transfer(log: &Log) -> Result<ParsedTransfer, Error> {
    if log.topics.len() != 3 {
        return Err(Error::Decode(format!(
            "transfer log at {}:{} has {} topics, expected 3",
            log.block_number,
            log.log_index,
            log.topics.len()
        )));
    }

    let from = address_from_topic(&log.topics[1])?;
    let to = address_from_topic(&log.topics[2])?;
    let value = value_from_data(&log.data)?;

    Ok(ParsedTransfer {
        from,
        to,
        value,
        tx_hash: log.tx_hash.clone(),
        block_number: log.block_number,
        log_index: log.log_index,
    })
}

/// An indexed `address` topic is a 32-byte word, left-padded with zeros.
fn address_from_topic(topic: &str) -> Result<String, Error> {
    let bytes = decode_hex_word(topic)?;
    if bytes.len() != 32 {
        return Err(Error::Decode(format!("topic {topic} is not 32 bytes")));
    }
    if bytes[..12].iter().any(|b| *b != 0) {
        return Err(Error::Decode(format!(
            "topic {topic} has non-zero padding, not a valid address"
        )));
    }
    Ok(format!("0x{}", hex::encode(&bytes[12..])))
}

/// The `value` field of the event data: a single 256-bit unsigned integer, big-endian.
fn value_from_data(data: &str) -> Result<Amount, Error> {
    let bytes = decode_hex_word(data)?;
    if bytes.len() != 32 {
        return Err(Error::Decode(format!(
            "transfer data is {} bytes, expected 32",
            bytes.len()
        )));
    }
    Ok(Amount::from_u256_be_bytes(&bytes))
}

fn decode_hex_word(s: &str) -> Result<Vec<u8>, Error> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(stripped).map_err(|e| Error::Decode(format!("invalid hex {s:?}: {e}")))
}

pub fn is_zero_address(addr: &str) -> bool {
    addr.eq_ignore_ascii_case(ZERO_ADDRESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic0_matches_known_signature_hash() {
        // keccak256("Transfer(address,address,uint256)")
        assert_eq!(
            transfer_topic0(),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    fn word_with_address(addr_bytes: [u8; 20]) -> String {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&addr_bytes);
        format!("0x{}", hex::encode(word))
    }

    fn log_for(from: [u8; 20], to: [u8; 20], value: u64) -> Log {
        let mut data = [0u8; 32];
        data[24..].copy_from_slice(&value.to_be_bytes());
        Log {
            tx_hash: "0xabc".to_string(),
            block_number: 10,
            log_index: 0,
            topics: vec![
                transfer_topic0(),
                word_with_address(from),
                word_with_address(to),
            ],
            data: format!("0x{}", hex::encode(data)),
        }
    }

    #[test]
    fn decodes_a_well_formed_transfer() {
        let from = [0x11; 20];
        let to = [0x22; 20];
        let log = log_for(from, to, 1_000);
        let parsed = decode_transfer(&log).unwrap();
        assert_eq!(parsed.from, format!("0x{}", hex::encode(from)));
        assert_eq!(parsed.to, format!("0x{}", hex::encode(to)));
        assert_eq!(parsed.value.to_string(), "1000");
    }

    #[test]
    fn mint_has_zero_address_from() {
        let log = log_for([0u8; 20], [0x22; 20], 1_000);
        let parsed = decode_transfer(&log).unwrap();
        assert!(is_zero_address(&parsed.from));
        assert!(!is_zero_address(&parsed.to));
    }

    #[test]
    fn rejects_wrong_topic_count() {
        let mut log = log_for([0x11; 20], [0x22; 20], 1_000);
        log.topics.pop();
        assert!(decode_transfer(&log).is_err());
    }

    #[test]
    fn rejects_padded_address_with_garbage() {
        let mut log = log_for([0x11; 20], [0x22; 20], 1_000);
        // Corrupt the high bytes of the `from` topic so it's no longer a valid address.
        let mut bytes = decode_hex_word(&log.topics[1]).unwrap();
        bytes[0] = 0xff;
        log.topics[1] = format!("0x{}", hex::encode(bytes));
        assert!(decode_transfer(&log).is_err());
    }
}
