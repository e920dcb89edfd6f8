// Wire message envelope

use crate::core::{Block, Hash256, Transaction};
use serde::{Deserialize, Serialize};

/// Peer-to-peer message. Serializes to the envelope
/// `{"type": "transaction" | "block", "data": {...}}`, one JSON object per
/// line on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Message {
    /// A transaction for the receiving node's pending pool
    Transaction(Transaction),
    /// A mined block for validation and append
    Block(Block),
}

impl Message {
    /// Identifier of the carried payload, used for duplicate suppression
    pub fn payload_id(&self) -> Hash256 {
        match self {
            Message::Transaction(tx) => tx.tx_hash,
            Message::Block(block) => block.block_hash,
        }
    }

    /// Encode as a single wire line (newline-terminated JSON)
    pub fn to_wire_line(&self) -> Result<String, String> {
        let mut line = serde_json::to_string(self)
            .map_err(|e| format!("Failed to serialize message: {}", e))?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one wire line
    pub fn from_wire_line(line: &str) -> Result<Self, String> {
        serde_json::from_str(line).map_err(|e| format!("Malformed message: {}", e))
    }
}
