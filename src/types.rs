//! Shared types for the coin-flip table.
//!
//! These types form the data model used across all modules: coin sides,
//! the wager phase machine, supported currencies, bet and settlement
//! records, and the error taxonomy.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A face of the coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    #[default]
    Head,
    Tail,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Head, Side::Tail];

    /// The other face.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Head => Side::Tail,
            Side::Tail => Side::Head,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Head => write!(f, "HEAD"),
            Side::Tail => write!(f, "TAIL"),
        }
    }
}

/// Case-insensitive; accepts singular, plural and single-letter forms.
impl FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "head" | "heads" | "h" => Ok(Side::Head),
            "tail" | "tails" | "t" => Ok(Side::Tail),
            other => anyhow::bail!("Unknown coin side: {other}"),
        }
    }
}

/// Stage of the wager state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    /// Accepting new bets and edits.
    #[default]
    Idle,
    /// Settlement pending; inputs locked.
    Flipping,
    /// Transient; folds back to `Idle` within the same settlement step.
    Settled,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "IDLE"),
            Phase::Flipping => write!(f, "FLIPPING"),
            Phase::Settled => write!(f, "SETTLED"),
        }
    }
}

// ---------------------------------------------------------------------------
// Currencies
// ---------------------------------------------------------------------------

/// Supported table currencies, keyed by the region code shown on the flag picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum CurrencyCode {
    #[default]
    In,
    Au,
    Ca,
    Pk,
    Se,
}

impl CurrencyCode {
    pub const ALL: &'static [CurrencyCode] = &[
        CurrencyCode::In,
        CurrencyCode::Au,
        CurrencyCode::Ca,
        CurrencyCode::Pk,
        CurrencyCode::Se,
    ];

    /// Full currency profile for this code.
    pub fn currency(self) -> Currency {
        let (symbol, baseline) = match self {
            CurrencyCode::In => ("₹", dec!(30)),
            CurrencyCode::Au => ("$", dec!(30)),
            CurrencyCode::Ca => ("$", dec!(30)),
            CurrencyCode::Pk => ("Rs", dec!(5000)),
            CurrencyCode::Se => ("kr", dec!(300)),
        };
        Currency {
            code: self,
            symbol,
            baseline_stake: baseline,
            min_stake_multiplier: Decimal::ONE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::In => "IN",
            CurrencyCode::Au => "AU",
            CurrencyCode::Ca => "CA",
            CurrencyCode::Pk => "PK",
            CurrencyCode::Se => "SE",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = WagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_uppercase();
        CurrencyCode::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| WagerError::UnknownCurrency(s.trim().to_string()))
    }
}

/// Display and staking parameters for one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Currency {
    pub code: CurrencyCode,
    pub symbol: &'static str,
    /// Stake the amount field resets to when this currency is selected.
    pub baseline_stake: Decimal,
    /// Scales the table's base minimum stake.
    pub min_stake_multiplier: Decimal,
}

impl Currency {
    /// Effective minimum stake given the table's base minimum.
    pub fn minimum_stake(&self, base_minimum: Decimal) -> Decimal {
        base_minimum * self.min_stake_multiplier
    }

    /// Format an amount the way the balance bar shows it: symbol + two decimals.
    pub fn format(&self, amount: Decimal) -> String {
        format!("{}{:.2}", self.symbol, amount)
    }
}

// ---------------------------------------------------------------------------
// Stake input
// ---------------------------------------------------------------------------

/// A requested stake: raw text from the amount field or an already-typed amount.
#[derive(Debug, Clone, PartialEq)]
pub enum StakeInput {
    Text(String),
    Amount(Decimal),
}

impl StakeInput {
    /// Parse into a strictly positive amount.
    pub fn parse(&self) -> Result<Decimal, ValidationError> {
        let amount = match self {
            StakeInput::Amount(a) => *a,
            StakeInput::Text(raw) => {
                let trimmed = raw.trim();
                Decimal::from_str(trimmed)
                    .or_else(|_| Decimal::from_scientific(trimmed))
                    .map_err(|_| ValidationError::InvalidAmount(raw.clone()))?
            }
        };
        if amount <= Decimal::ZERO {
            return Err(ValidationError::InvalidAmount(amount.to_string()));
        }
        Ok(amount.normalize())
    }
}

impl From<&str> for StakeInput {
    fn from(s: &str) -> Self {
        StakeInput::Text(s.to_string())
    }
}

impl From<String> for StakeInput {
    fn from(s: String) -> Self {
        StakeInput::Text(s)
    }
}

impl From<Decimal> for StakeInput {
    fn from(d: Decimal) -> Self {
        StakeInput::Amount(d)
    }
}

// ---------------------------------------------------------------------------
// Bets and settlements
// ---------------------------------------------------------------------------

/// A bet accepted by the engine and awaiting settlement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingBet {
    pub bet_id: Uuid,
    pub stake: Decimal,
    pub side: Side,
    pub currency: CurrencyCode,
    pub placed_at: DateTime<Utc>,
}

/// Outcome of one settled flip, handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettlementResult {
    pub bet_id: Uuid,
    pub chosen_side: Side,
    pub outcome_side: Side,
    pub won: bool,
    pub stake: Decimal,
    pub balance_before: Decimal,
    pub new_balance: Decimal,
    pub currency: CurrencyCode,
    pub settled_at: DateTime<Utc>,
}

impl SettlementResult {
    /// Signed balance change of this flip.
    pub fn pnl(&self) -> Decimal {
        self.new_balance - self.balance_before
    }
}

impl fmt::Display for SettlementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let currency = self.currency.currency();
        write!(
            f,
            "{} | picked {} | {} {} | balance {}",
            self.outcome_side,
            self.chosen_side,
            if self.won { "WON" } else { "LOST" },
            currency.format(self.stake),
            currency.format(self.new_balance),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Bet rejected by stake validation. Never changes balance or phase.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("below minimum: stake {stake} is less than the minimum of {minimum}")]
    BelowMinimum { stake: Decimal, minimum: Decimal },

    #[error("insufficient balance: stake {stake} exceeds balance {balance}")]
    InsufficientBalance { stake: Decimal, balance: Decimal },

    #[error("balance limit: winning {stake} on {balance} would overflow the balance")]
    BalanceLimit { stake: Decimal, balance: Decimal },
}

/// Errors from wager operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WagerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a flip is already in progress")]
    FlipInProgress,

    #[error("unknown currency: {0}")]
    UnknownCurrency(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
