//! Session configuration with validation and defaults.
//!
//! Amount fields are (de)serialized as decimal strings because TOML integers
//! top out at `i64` while stakes are `u128`; plain integers are still accepted
//! when they fit.

use crate::types::Amount;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("failed to parse configuration: {0}")]
    ParseFailed(#[from] toml::de::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Number of distinct participants that closes entry and triggers
    /// resolution.
    pub entry_threshold: u32,

    /// Minimum stake per entry, smallest token unit.
    #[serde(with = "amount_string")]
    pub min_amount: Amount,

    /// Protocol fee in basis points, taken from the pot on settlement.
    pub fee_bps: u16,

    /// Opaque deployment tag carried from construction. Observed value 896 in
    /// the original deployment; it plays no role in quorum or payout.
    pub table_code: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            entry_threshold: 4,
            // One whole token at 18 decimals.
            min_amount: 1_000_000_000_000_000_000,
            fee_bps: 0,
            table_code: 896,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_threshold < 2 {
            return Err(ConfigError::InvalidValue {
                field: "entry_threshold",
                reason: format!("{} (a round needs at least 2 players)", self.entry_threshold),
            });
        }
        if self.fee_bps > 10_000 {
            return Err(ConfigError::InvalidValue {
                field: "fee_bps",
                reason: format!("{} exceeds 10000", self.fee_bps),
            });
        }
        if self.min_amount == 0 {
            return Err(ConfigError::InvalidValue {
                field: "min_amount",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }
}

/// Serde adapter: `u128` as a decimal string, tolerating bare integers.
mod amount_string {
    use crate::types::Amount;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n as Amount),
            Raw::Text(s) => s
                .parse::<Amount>()
                .map_err(|e| de::Error::custom(format!("invalid amount '{}': {}", s, e))),
        }
    }
}
