//! Ethscription mint payloads and their on-chain data encoding.
//!
//! A mint is a self-transaction whose calldata is the UTF-8 text
//!
//! ```text
//! data:,{"p":"erc-20","op":"mint","tick":"nodes","id":"123","amt":"10000"}
//! ```
//!
//! The indexer identifies an inscription by the SHA-256 of that text, so the
//! rendering must be byte-exact: compact JSON, fields in this order.

use crate::{sha256, EncodeHex};
use anyhow::Context;
use num_bigint::BigUint;
use serde::Serialize;

const DATA_URI_PREFIX: &str = "data:,";

#[derive(Serialize, Debug)]
struct MintPayload<'a> {
    p: &'a str,
    op: &'a str,
    tick: &'a str,
    id: String,
    amt: &'a str,
}

/// Everything of a mint payload except the id.
#[derive(Debug, Clone)]
pub struct MintTemplate {
    pub protocol: String,
    pub op: String,
    pub tick: String,
    pub amount: String,
}

impl Default for MintTemplate {
    fn default() -> Self {
        Self {
            protocol: "erc-20".into(),
            op: "mint".into(),
            tick: "nodes".into(),
            amount: "10000".into(),
        }
    }
}

impl MintTemplate {
    pub fn render(&self, id: u64) -> String {
        let payload = MintPayload {
            p: &self.protocol,
            op: &self.op,
            tick: &self.tick,
            id: id.to_string(),
            amt: &self.amount,
        };
        let json = serde_json::to_string(&payload).expect("string-only struct serializes");
        format!("{DATA_URI_PREFIX}{json}")
    }
}

/// Hex SHA-256 of the payload text; the key the existence API is queried by.
pub fn content_digest(payload: &str) -> String {
    sha256(payload.as_bytes()).hex()
}

/// The payload bytes read as one big-endian integer, in `0x` hex.
///
/// Leading zero nibbles are not kept, so this is not always an even-length
/// hex string.
pub fn encode_data(payload: &str) -> String {
    let int = BigUint::from_bytes_be(payload.as_bytes());
    format!("0x{}", int.to_str_radix(16))
}

/// Calldata bytes for an [`encode_data`] string.
pub fn decode_data(encoded: &str) -> anyhow::Result<Vec<u8>> {
    let digits = encoded.strip_prefix("0x").unwrap_or(encoded);
    let bytes = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))
    } else {
        hex::decode(digits)
    };
    bytes.with_context(|| format!("malformed payload encoding: {encoded}"))
}
