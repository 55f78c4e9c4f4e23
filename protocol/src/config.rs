//! # Vault Configuration & Constants
//!
//! Every magic number in Kestrel lives here. Fee rates, price scales, the
//! governance delay ceiling: if a number shows up in accounting math and it
//! isn't defined in this file, it's a bug waiting for an audit to find it.
//!
//! Runtime configuration comes in two layers:
//!
//! - [`GovernanceConfig`]: delay and fee caps applied by the timelocked
//!   parameter store. Deserializable from JSON so deployments can keep it
//!   next to the rest of their settings.
//! - [`VaultConfig`]: the immutable per-vault setup: canonical token order
//!   and existential thresholds. Fixed at creation, never reordered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::Amount;

// ---------------------------------------------------------------------------
// Scales
// ---------------------------------------------------------------------------

/// Denominator for every fee rate. A rate of `10^9` is 100% per year.
/// Nine decimal digits is enough resolution that nobody has ever asked for
/// a tenth.
pub const FEE_DENOMINATOR: u128 = 1_000_000_000;

/// Scale for per-share prices and the high-water mark (18 decimals).
pub const D18: u128 = 1_000_000_000_000_000_000;

/// Fees are annualized against a flat 365-day year. No leap years, no
/// calendar drama.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

// ---------------------------------------------------------------------------
// Fee Caps
// ---------------------------------------------------------------------------

/// Hard ceiling on the management fee: 10% per year.
pub const MAX_MANAGEMENT_FEE: u128 = 100_000_000;

/// Hard ceiling on the performance fee: 50% of profit above the mark.
pub const MAX_PERFORMANCE_FEE: u128 = 500_000_000;

/// Hard ceiling on the protocol fee: 5% per year.
pub const MAX_PROTOCOL_FEE: u128 = 50_000_000;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Default delay between staging and committing a parameter: one day.
/// Long enough for depositors to notice a fee hike and leave.
pub const DEFAULT_GOVERNANCE_DELAY: u64 = 86_400;

/// Upper bound on the governance delay. Two weeks. Anything longer and
/// governance can't fix its own mistakes in a reasonable time.
pub const MAX_GOVERNANCE_DELAY: u64 = 14 * 86_400;

// ---------------------------------------------------------------------------
// Deposits
// ---------------------------------------------------------------------------

/// The first deposit into an empty vault must bring at least this many
/// existentials of every asset. Seeding a vault with dust makes the price
/// per share trivially manipulable.
pub const FIRST_DEPOSIT_EXISTENTIAL_MULTIPLIER: u128 = 10;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a configuration is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Token identifiers must be strictly ascending.
    #[error("tokens are not sorted: {0} appears after {1}")]
    UnsortedTokens(String, String),

    /// The same token was listed twice.
    #[error("duplicate token: {0}")]
    DuplicateToken(String),

    /// A vault needs at least one underlying asset.
    #[error("vault has no tokens")]
    NoTokens,

    /// `existentials` must have one entry per token.
    #[error("existentials length mismatch: {tokens} tokens, {existentials} existentials")]
    LengthMismatch {
        /// Number of tokens configured.
        tokens: usize,
        /// Number of existential thresholds configured.
        existentials: usize,
    },

    /// An existential threshold of zero would let dust into the share math.
    #[error("existential threshold for {0} is zero")]
    ZeroExistential(String),

    /// The governance delay exceeds [`MAX_GOVERNANCE_DELAY`].
    #[error("governance delay {delay}s exceeds maximum {max}s")]
    DelayTooLong {
        /// Configured delay.
        delay: u64,
        /// Allowed maximum.
        max: u64,
    },

    /// A configured fee cap is above the hard ceiling for that fee.
    #[error("{name} cap {value} exceeds hard maximum {max}")]
    CapTooHigh {
        /// Which cap.
        name: &'static str,
        /// Configured value.
        value: u128,
        /// Hard ceiling.
        max: u128,
    },

    /// JSON could not be parsed.
    #[error("config parse error: {0}")]
    Parse(String),
}

// ---------------------------------------------------------------------------
// GovernanceConfig
// ---------------------------------------------------------------------------

/// Timelock and fee-cap settings for a vault's governance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Seconds between `stage` and the earliest successful `commit`.
    pub governance_delay: u64,
    /// Largest management fee that may be staged.
    pub max_management_fee: u128,
    /// Largest performance fee that may be staged.
    pub max_performance_fee: u128,
    /// Largest protocol fee that may be staged.
    pub max_protocol_fee: u128,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            governance_delay: DEFAULT_GOVERNANCE_DELAY,
            max_management_fee: MAX_MANAGEMENT_FEE,
            max_performance_fee: MAX_PERFORMANCE_FEE,
            max_protocol_fee: MAX_PROTOCOL_FEE,
        }
    }
}

impl GovernanceConfig {
    /// Parse from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the delay and caps against the hard limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.governance_delay > MAX_GOVERNANCE_DELAY {
            return Err(ConfigError::DelayTooLong {
                delay: self.governance_delay,
                max: MAX_GOVERNANCE_DELAY,
            });
        }
        let caps = [
            ("management fee", self.max_management_fee, MAX_MANAGEMENT_FEE),
            ("performance fee", self.max_performance_fee, MAX_PERFORMANCE_FEE),
            ("protocol fee", self.max_protocol_fee, MAX_PROTOCOL_FEE),
        ];
        for (name, value, max) in caps {
            if value > max {
                return Err(ConfigError::CapTooHigh { name, value, max });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

/// Immutable setup of a single vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Underlying asset identifiers, sorted and unique.
    pub tokens: Vec<String>,
    /// Minimum non-dust balance per asset, same order as `tokens`.
    pub existentials: Vec<Amount>,
    /// Timelock and cap settings.
    #[serde(default)]
    pub governance: GovernanceConfig,
}

impl VaultConfig {
    /// Creates a config with default governance settings.
    pub fn new(tokens: Vec<String>, existentials: Vec<Amount>) -> Self {
        Self {
            tokens,
            existentials,
            governance: GovernanceConfig::default(),
        }
    }

    /// Number of underlying assets.
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Checks canonical ordering, lengths and thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.is_empty() {
            return Err(ConfigError::NoTokens);
        }
        if self.tokens.len() != self.existentials.len() {
            return Err(ConfigError::LengthMismatch {
                tokens: self.tokens.len(),
                existentials: self.existentials.len(),
            });
        }
        for pair in self.tokens.windows(2) {
            match pair[0].cmp(&pair[1]) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(ConfigError::DuplicateToken(pair[1].clone()))
                }
                std::cmp::Ordering::Greater => {
                    return Err(ConfigError::UnsortedTokens(
                        pair[1].clone(),
                        pair[0].clone(),
                    ))
                }
            }
        }
        for (token, existential) in self.tokens.iter().zip(&self.existentials) {
            if *existential == 0 {
                return Err(ConfigError::ZeroExistential(token.clone()));
            }
        }
        self.governance.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_fee_caps_below_denominator() {
        // A cap at or above 100% would let governance mint the whole vault.
        assert!(MAX_MANAGEMENT_FEE < FEE_DENOMINATOR);
        assert!(MAX_PERFORMANCE_FEE < FEE_DENOMINATOR);
        assert!(MAX_PROTOCOL_FEE < FEE_DENOMINATOR);
    }

    #[test]
    fn test_default_delay_within_bounds() {
        assert!(DEFAULT_GOVERNANCE_DELAY <= MAX_GOVERNANCE_DELAY);
        assert!(GovernanceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_valid_vault_config() {
        let config = VaultConfig::new(tokens(&["usdc", "weth"]), vec![1_000, 1_000]);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.token_count(), 2);
    }

    #[test]
    fn test_unsorted_tokens_rejected() {
        let config = VaultConfig::new(tokens(&["weth", "usdc"]), vec![1, 1]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnsortedTokens("usdc".into(), "weth".into()))
        );
    }

    #[test]
    fn test_duplicate_tokens_rejected() {
        let config = VaultConfig::new(tokens(&["usdc", "usdc"]), vec![1, 1]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateToken("usdc".into()))
        );
    }

    #[test]
    fn test_existentials_length_mismatch() {
        let config = VaultConfig::new(tokens(&["usdc", "weth"]), vec![1]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::LengthMismatch { tokens: 2, existentials: 1 })
        ));
    }

    #[test]
    fn test_zero_existential_rejected() {
        let config = VaultConfig::new(tokens(&["usdc"]), vec![0]);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroExistential("usdc".into()))
        );
    }

    #[test]
    fn test_governance_config_from_json_defaults_missing_fields() {
        let config = GovernanceConfig::from_json(r#"{ "governance_delay": 3600 }"#).unwrap();
        assert_eq!(config.governance_delay, 3600);
        assert_eq!(config.max_protocol_fee, MAX_PROTOCOL_FEE);
    }

    #[test]
    fn test_governance_config_rejects_long_delay() {
        let json = format!(r#"{{ "governance_delay": {} }}"#, MAX_GOVERNANCE_DELAY + 1);
        assert!(matches!(
            GovernanceConfig::from_json(&json),
            Err(ConfigError::DelayTooLong { .. })
        ));
    }

    #[test]
    fn test_governance_config_rejects_cap_above_ceiling() {
        let config = GovernanceConfig {
            max_performance_fee: MAX_PERFORMANCE_FEE + 1,
            ..GovernanceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::CapTooHigh { name: "performance fee", .. })
        ));
    }
}
