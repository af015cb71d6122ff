//! Fixed-offset decoding of list operations and list storage locations.
//!
//! Neither decoder fails on short input: operations decode best-effort (missing bytes read
//! as zero), storage locations decode to an all-zero sentinel that callers must check with
//! [ListStorageLocation::is_absent].

use alloy::primitives::{Address, U256};
use std::fmt;
use thiserror::Error;

/// Header (version, opcode, record version, record type) plus a 20-byte record address.
pub const OPERATION_MIN_LEN: usize = 24;

/// version(1) + type(1) + chainId(32) + contract(20) + slot(32).
pub const STORAGE_LOCATION_LEN: usize = 86;

/// Minimum hex length of an encoded storage location, `0x` prefix included.
pub const STORAGE_LOCATION_MIN_HEX_LEN: usize = 2 + STORAGE_LOCATION_LEN * 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid hex payload: {0}")]
    InvalidHex(String),
}

/// List-op opcode (byte 1 of an encoded operation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Opcode {
    Follow,
    Unfollow,
    Tag,
    Untag,
    Unknown(u8),
}

impl Opcode {
    pub fn from_u8(n: u8) -> Self {
        match n {
            0x01 => Opcode::Follow,
            0x02 => Opcode::Unfollow,
            0x03 => Opcode::Tag,
            0x04 => Opcode::Untag,
            other => Opcode::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Opcode::Follow => 0x01,
            Opcode::Unfollow => 0x02,
            Opcode::Tag => 0x03,
            Opcode::Untag => 0x04,
            Opcode::Unknown(n) => n,
        }
    }

    /// Human-readable name; empty for unknown opcodes.
    pub fn description(self) -> &'static str {
        match self {
            Opcode::Follow => "Follow",
            Opcode::Unfollow => "Unfollow",
            Opcode::Tag => "Tag",
            Opcode::Untag => "Untag",
            Opcode::Unknown(_) => "",
        }
    }

    /// Two-character lowercase hex form (`"01"`), as used in the JSON documents.
    pub fn to_hex(self) -> String {
        format!("{:02x}", self.as_u8())
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        u8::from_str_radix(s, 16)
            .map(Opcode::from_u8)
            .map_err(|_| CodecError::InvalidHex(s.to_string()))
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// One decoded list operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub version: u8,
    pub opcode: Opcode,
    pub record_version: u8,
    pub record_type: u8,
    pub record_address: Address,
    /// Tag text; empty unless `opcode` is [Opcode::Tag].
    pub tag: String,
}

impl Operation {
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        Ok(decode_operation(&decode_hex(s)?))
    }
}

/// Decode an encoded list operation.
pub fn decode_operation(bytes: &[u8]) -> Operation {
    if bytes.len() < OPERATION_MIN_LEN {
        tracing::debug!(len = bytes.len(), "list op shorter than fixed layout, zero-filling");
    }
    let byte_at = |i: usize| bytes.get(i).copied().unwrap_or(0);

    let mut address = [0u8; 20];
    if let Some(available) = bytes.get(4..) {
        let n = available.len().min(20);
        address[..n].copy_from_slice(&available[..n]);
    }

    let opcode = Opcode::from_u8(byte_at(1));
    let tag = match (opcode, bytes.get(OPERATION_MIN_LEN..)) {
        (Opcode::Tag, Some(rest)) => String::from_utf8_lossy(rest).into_owned(),
        _ => String::new(),
    };

    Operation {
        version: byte_at(0),
        opcode,
        record_version: byte_at(2),
        record_type: byte_at(3),
        record_address: Address::from(address),
        tag,
    }
}

/// Pointer from a list token to the (chain, contract, slot) holding its ops.
///
/// `Default` is the zero sentinel produced for short input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListStorageLocation {
    pub version: u8,
    pub kind: u8,
    pub chain_id: U256,
    pub list_records_contract: Address,
    pub slot: U256,
}

impl ListStorageLocation {
    /// True for the zero sentinel (missing or truncated payload).
    pub fn is_absent(&self) -> bool {
        *self == Self::default()
    }

    /// Decode from hex. Strings shorter than [STORAGE_LOCATION_MIN_HEX_LEN] (counting a `0x`
    /// prefix, which is assumed when absent) yield the sentinel.
    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() + 2 < STORAGE_LOCATION_MIN_HEX_LEN {
            return Ok(Self::default());
        }
        Ok(decode_storage_location(&decode_hex(s)?))
    }
}

/// Decode an encoded list storage location; short input yields the zero sentinel.
pub fn decode_storage_location(bytes: &[u8]) -> ListStorageLocation {
    if bytes.len() < STORAGE_LOCATION_LEN {
        tracing::debug!(len = bytes.len(), "list storage location too short, using sentinel");
        return ListStorageLocation::default();
    }
    ListStorageLocation {
        version: bytes[0],
        kind: bytes[1],
        chain_id: U256::from_be_slice(&bytes[2..34]),
        list_records_contract: Address::from_slice(&bytes[34..54]),
        slot: U256::from_be_slice(&bytes[54..86]),
    }
}

fn decode_hex(s: &str) -> Result<Vec<u8>, CodecError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| CodecError::InvalidHex(e.to_string()))
}

/// Encode an operation back into its fixed layout. Used to build fixtures.
pub fn encode_operation(op: &Operation) -> Vec<u8> {
    let mut out = Vec::with_capacity(OPERATION_MIN_LEN + op.tag.len());
    out.extend_from_slice(&[op.version, op.opcode.as_u8(), op.record_version, op.record_type]);
    out.extend_from_slice(op.record_address.as_slice());
    if op.opcode == Opcode::Tag {
        out.extend_from_slice(op.tag.as_bytes());
    }
    out
}

/// Encode a storage location into its fixed 86-byte layout.
pub fn encode_storage_location(lsl: &ListStorageLocation) -> Vec<u8> {
    let mut out = Vec::with_capacity(STORAGE_LOCATION_LEN);
    out.push(lsl.version);
    out.push(lsl.kind);
    out.extend_from_slice(&lsl.chain_id.to_be_bytes::<32>());
    out.extend_from_slice(lsl.list_records_contract.as_slice());
    out.extend_from_slice(&lsl.slot.to_be_bytes::<32>());
    out
}
