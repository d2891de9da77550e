//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default matching the observed game rules, so a
//! missing file or a partial file still yields a playable table.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::types::CurrencyCode;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub game: GameConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub account: AccountConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GameConfig {
    /// Balance a fresh session starts with.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: Decimal,
    /// Minimum stake in base units, before the currency multiplier.
    #[serde(default = "default_minimum_stake")]
    pub minimum_stake: Decimal,
    #[serde(default = "default_settlement_delay_ms")]
    pub settlement_delay_ms: u64,
    #[serde(default)]
    pub default_currency: CurrencyCode,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            initial_balance: default_initial_balance(),
            minimum_stake: default_minimum_stake(),
            settlement_delay_ms: default_settlement_delay_ms(),
            default_currency: CurrencyCode::default(),
        }
    }
}

impl GameConfig {
    pub fn settlement_delay(&self) -> Duration {
        Duration::from_millis(self.settlement_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default = "default_auth_base_url")]
    pub base_url: String,
    #[serde(default = "default_auth_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            base_url: default_auth_base_url(),
            timeout_secs: default_auth_timeout_secs(),
        }
    }
}

/// Password recovery and cashier settings.
#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    /// Code the verification step accepts. There is no delivery backend.
    #[serde(default = "default_verification_code")]
    pub verification_code: String,
    #[serde(default = "default_resend_cooldown_secs")]
    pub resend_cooldown_secs: u64,
    /// UPI address shown on the deposit screen.
    #[serde(default = "default_upi_id")]
    pub upi_id: String,
    #[serde(default = "default_withdrawal_processing_ms")]
    pub withdrawal_processing_ms: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            verification_code: default_verification_code(),
            resend_cooldown_secs: default_resend_cooldown_secs(),
            upi_id: default_upi_id(),
            withdrawal_processing_ms: default_withdrawal_processing_ms(),
        }
    }
}

impl AccountConfig {
    pub fn resend_cooldown(&self) -> Duration {
        Duration::from_secs(self.resend_cooldown_secs)
    }

    pub fn withdrawal_processing(&self) -> Duration {
        Duration::from_millis(self.withdrawal_processing_ms)
    }
}

/// Largest starting balance accepted, far below where a winning flip could
/// overflow `Decimal`.
pub const MAX_INITIAL_BALANCE: Decimal = dec!(1000000000000);

fn default_initial_balance() -> Decimal {
    dec!(100)
}

fn default_minimum_stake() -> Decimal {
    dec!(15)
}

fn default_settlement_delay_ms() -> u64 {
    1000
}

fn default_auth_base_url() -> String {
    "https://ftbtest1.onrender.com/api".to_string()
}

fn default_auth_timeout_secs() -> u64 {
    30
}

fn default_verification_code() -> String {
    "1234".to_string()
}

fn default_resend_cooldown_secs() -> u64 {
    30
}

fn default_upi_id() -> String {
    "user9801@upi".to_string()
}

fn default_withdrawal_processing_ms() -> u64 {
    2000
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            info!(path, "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents).context("Invalid TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the table unplayable.
    pub fn validate(&self) -> Result<()> {
        if self.game.initial_balance < Decimal::ZERO {
            anyhow::bail!("game.initial_balance must not be negative");
        }
        if self.game.initial_balance > MAX_INITIAL_BALANCE {
            anyhow::bail!("game.initial_balance must not exceed {MAX_INITIAL_BALANCE}");
        }
        if self.game.minimum_stake <= Decimal::ZERO {
            anyhow::bail!("game.minimum_stake must be positive");
        }
        if self.auth.base_url.trim().is_empty() {
            anyhow::bail!("auth.base_url must not be empty");
        }
        let code = &self.account.verification_code;
        if code.len() != crate::forms::VERIFICATION_CODE_LEN
            || !code.chars().all(|c| c.is_ascii_digit())
        {
            anyhow::bail!("account.verification_code must be 4 digits");
        }
        Ok(())
    }
}
