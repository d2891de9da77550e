//! Wager session state.
//!
//! One player's betting state at the table: selected currency, stake and
//! side, the in-memory balance, the phase of the current flip, and running
//! statistics. Nothing here is persisted; a new session starts from the
//! configured balance every time.
//!
//! Edits are only accepted while the session is idle. Balance and
//! statistics are mutated exclusively by the engine at settlement.

use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::types::{
    Currency, CurrencyCode, PendingBet, Phase, SettlementResult, Side, WagerError,
};

/// Running totals over the session's settled flips.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStats {
    pub flips: u64,
    pub wins: u64,
    pub losses: u64,
    pub net_pnl: Decimal,
    pub peak_balance: Decimal,
}

impl SessionStats {
    fn new(initial_balance: Decimal) -> Self {
        Self {
            flips: 0,
            wins: 0,
            losses: 0,
            net_pnl: Decimal::ZERO,
            peak_balance: initial_balance,
        }
    }

    /// Win rate as a percentage. Returns 0 if nothing has settled yet.
    pub fn win_rate(&self) -> Decimal {
        if self.flips == 0 {
            Decimal::ZERO
        } else {
            Decimal::from(self.wins) * Decimal::ONE_HUNDRED / Decimal::from(self.flips)
        }
    }
}

/// A single player's wager state.
#[derive(Debug, Clone)]
pub struct WagerSession {
    id: Uuid,
    currency: CurrencyCode,
    stake_amount: Decimal,
    chosen_side: Side,
    balance: Decimal,
    outcome_side: Option<Side>,
    phase: Phase,
    pub(crate) pending: Option<PendingBet>,
    last_settlement: Option<SettlementResult>,
    stats: SessionStats,
}

impl WagerSession {
    /// Create a fresh session: idle, stake at the currency's baseline.
    pub fn new(initial_balance: Decimal, currency: CurrencyCode) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            currency,
            stake_amount: currency.currency().baseline_stake,
            chosen_side: Side::Head,
            balance: initial_balance,
            outcome_side: None,
            phase: Phase::Idle,
            pending: None,
            last_settlement: None,
            stats: SessionStats::new(initial_balance),
        };
        debug!(session_id = %session.id, balance = %initial_balance, currency = %currency, "Session created");
        session
    }

    // -- Accessors -------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn currency(&self) -> Currency {
        self.currency.currency()
    }

    pub fn currency_code(&self) -> CurrencyCode {
        self.currency
    }

    pub fn stake_amount(&self) -> Decimal {
        self.stake_amount
    }

    pub fn chosen_side(&self) -> Side {
        self.chosen_side
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    /// Side the coin landed on in the most recent settlement.
    pub fn outcome_side(&self) -> Option<Side> {
        self.outcome_side
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<&PendingBet> {
        self.pending.as_ref()
    }

    pub fn last_settlement(&self) -> Option<&SettlementResult> {
        self.last_settlement.as_ref()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_locked(&self) -> bool {
        self.phase == Phase::Flipping
    }

    // -- Edits (idle only) -----------------------------------------------

    fn ensure_idle(&self) -> Result<(), WagerError> {
        if self.phase == Phase::Idle {
            Ok(())
        } else {
            Err(WagerError::FlipInProgress)
        }
    }

    /// Pick the side to bet on.
    pub fn select_side(&mut self, side: Side) -> Result<(), WagerError> {
        self.ensure_idle()?;
        self.chosen_side = side;
        debug!(session_id = %self.id, side = %side, "Side selected");
        Ok(())
    }

    /// Switch currency; the stake resets to the new currency's baseline.
    pub fn select_currency(&mut self, code: CurrencyCode) -> Result<(), WagerError> {
        self.ensure_idle()?;
        self.currency = code;
        self.stake_amount = code.currency().baseline_stake;
        debug!(
            session_id = %self.id,
            currency = %code,
            stake = %self.stake_amount,
            "Currency selected"
        );
        Ok(())
    }

    /// Edit the stake field. Range checks happen when the bet is placed.
    pub fn set_stake(&mut self, amount: Decimal) -> Result<(), WagerError> {
        self.ensure_idle()?;
        self.stake_amount = amount;
        debug!(session_id = %self.id, stake = %amount, "Stake edited");
        Ok(())
    }

    // -- Engine-only transitions -----------------------------------------

    /// IDLE → FLIPPING with the accepted bet recorded.
    pub(crate) fn begin_flip(&mut self, bet: PendingBet) {
        self.stake_amount = bet.stake;
        self.chosen_side = bet.side;
        self.pending = Some(bet);
        self.phase = Phase::Flipping;
    }

    /// FLIPPING → SETTLED → IDLE, applying the balance change exactly once.
    pub(crate) fn settle(&mut self, result: SettlementResult) {
        self.balance = result.new_balance;
        self.outcome_side = Some(result.outcome_side);
        self.pending = None;
        self.phase = Phase::Settled;

        self.stats.flips += 1;
        if result.won {
            self.stats.wins += 1;
        } else {
            self.stats.losses += 1;
        }
        self.stats.net_pnl += result.pnl();
        if self.balance > self.stats.peak_balance {
            self.stats.peak_balance = self.balance;
        }

        self.last_settlement = Some(result);
        self.phase = Phase::Idle;
    }

    /// Drop the pending bet without settling it. Balance is untouched.
    pub(crate) fn void_pending(&mut self) -> Option<PendingBet> {
        let bet = self.pending.take();
        self.phase = Phase::Idle;
        bet
    }

    /// Serializable view for the presentation layer.
    pub fn snapshot(&self) -> SessionSnapshot {
        let currency = self.currency();
        SessionSnapshot {
            session_id: self.id,
            phase: self.phase,
            currency: self.currency,
            currency_symbol: currency.symbol.to_string(),
            stake_amount: self.stake_amount,
            chosen_side: self.chosen_side,
            balance: self.balance,
            outcome_side: self.outcome_side,
            stats: self.stats.clone(),
        }
    }
}

impl fmt::Display for WagerSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let currency = self.currency();
        write!(
            f,
            "{} | balance={} | stake={} on {} | flips={} (W{}/L{}) | win_rate={:.1}%",
            self.phase,
            currency.format(self.balance),
            currency.format(self.stake_amount),
            self.chosen_side,
            self.stats.flips,
            self.stats.wins,
            self.stats.losses,
            self.stats.win_rate(),
        )
    }
}

/// What the presentation layer renders: coin state, balance bar, stake field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub currency: CurrencyCode,
    pub currency_symbol: String,
    pub stake_amount: Decimal,
    pub chosen_side: Side,
    pub balance: Decimal,
    pub outcome_side: Option<Side>,
    pub stats: SessionStats,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
