//! Core data types shared across the session engine.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Token amount in the ledger's smallest unit.
///
/// Stakes observed in production are on the order of 2 * 10^26 (hundreds of
/// millions of an 18-decimal token), so `u64` is not wide enough.
pub type Amount = u128;

/// 20-byte address-like identity key.
///
/// Serialized as a `0x`-prefixed hex string so audit records stay readable.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex in address: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("address must be 20 bytes, got {0}")]
    BadLength(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)?;
        let arr: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::BadLength(bytes.len()))?;
        Ok(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Session lifecycle phase.
///
/// Advances monotonically `Idle -> Filling -> Resolving -> Settled`; the only
/// re-entry is `Settled -> Idle` via an owner reset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No entries yet, accepting.
    Idle,
    /// At least one entry, still below quorum, accepting.
    Filling,
    /// Quorum reached, entry closed, outcome/payout in progress.
    Resolving,
    /// Payout complete, awaiting owner reset.
    Settled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Filling => write!(f, "filling"),
            Phase::Resolving => write!(f, "resolving"),
            Phase::Settled => write!(f, "settled"),
        }
    }
}

/// A registered participant in the current round.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Participant {
    pub identity: Address,
    /// Amount escrowed by this participant, smallest token unit.
    pub stake: Amount,
    /// True once successfully entered; cleared on session reset.
    pub is_playing: bool,
}
