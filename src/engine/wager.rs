//! Wager engine: bet validation and settlement.
//!
//! `place_bet` checks a request against the session in a fixed order
//! (lock, amount, minimum, balance) and moves the session to FLIPPING.
//! `resolve_outcome` draws the coin, applies exactly ±stake to the
//! balance and folds the session back to IDLE.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::engine::coin::CoinSource;
use crate::session::WagerSession;
use crate::types::{PendingBet, Phase, SettlementResult, Side, StakeInput, ValidationError, WagerError};

pub struct WagerEngine<C> {
    coin: C,
    /// Base minimum stake before the currency multiplier.
    minimum_stake: Decimal,
}

impl<C: CoinSource> WagerEngine<C> {
    pub fn new(coin: C, minimum_stake: Decimal) -> Self {
        Self { coin, minimum_stake }
    }

    pub fn minimum_stake(&self) -> Decimal {
        self.minimum_stake
    }

    /// Minimum stake for the session's current currency.
    pub fn minimum_for(&self, session: &WagerSession) -> Decimal {
        session.currency().minimum_stake(self.minimum_stake)
    }

    /// Check a stake against the session without changing anything.
    pub fn validate(
        &self,
        session: &WagerSession,
        stake: &StakeInput,
    ) -> Result<Decimal, ValidationError> {
        let amount = stake.parse()?;

        let minimum = self.minimum_for(session);
        if amount < minimum {
            return Err(ValidationError::BelowMinimum { stake: amount, minimum });
        }

        let balance = session.balance();
        if amount > balance {
            return Err(ValidationError::InsufficientBalance { stake: amount, balance });
        }
        if balance.checked_add(amount).is_none() {
            return Err(ValidationError::BalanceLimit { stake: amount, balance });
        }

        Ok(amount)
    }

    /// Accept a bet and lock the session until it settles.
    ///
    /// On rejection the session is left exactly as it was.
    pub fn place_bet(
        &self,
        session: &mut WagerSession,
        stake: impl Into<StakeInput>,
        side: Side,
    ) -> Result<PendingBet, WagerError> {
        if session.phase() != Phase::Idle {
            warn!(session_id = %session.id(), phase = %session.phase(), "Bet rejected: flip in progress");
            return Err(WagerError::FlipInProgress);
        }

        let stake = stake.into();
        let amount = self.validate(session, &stake).map_err(|e| {
            warn!(session_id = %session.id(), error = %e, "Bet rejected");
            e
        })?;

        let bet = PendingBet {
            bet_id: Uuid::new_v4(),
            stake: amount,
            side,
            currency: session.currency_code(),
            placed_at: Utc::now(),
        };
        session.begin_flip(bet.clone());

        info!(
            session_id = %session.id(),
            bet_id = %bet.bet_id,
            stake = %amount,
            side = %side,
            currency = %bet.currency,
            "Bet accepted, coin flipping"
        );

        Ok(bet)
    }

    /// Place a bet using the stake and side currently selected on the session.
    pub fn place_current_bet(&self, session: &mut WagerSession) -> Result<PendingBet, WagerError> {
        let stake = session.stake_amount();
        let side = session.chosen_side();
        self.place_bet(session, stake, side)
    }

    /// Settle the pending bet, if any.
    ///
    /// Returns `None` and leaves the session untouched when nothing is
    /// pending, so a repeated call can never move the balance twice. A bet
    /// whose payout cannot be represented is voided instead of settled.
    pub fn resolve_outcome(&mut self, session: &mut WagerSession) -> Option<SettlementResult> {
        let bet = match session.pending() {
            Some(bet) if session.phase() == Phase::Flipping => bet.clone(),
            _ => {
                debug!(session_id = %session.id(), "No pending flip to resolve");
                return None;
            }
        };

        let outcome_side = self.coin.draw();
        let won = bet.side == outcome_side;
        let balance_before = session.balance();
        let settled = if won {
            balance_before.checked_add(bet.stake)
        } else {
            balance_before.checked_sub(bet.stake)
        };
        let Some(new_balance) = settled else {
            error!(
                session_id = %session.id(),
                bet_id = %bet.bet_id,
                stake = %bet.stake,
                balance = %balance_before,
                "Settlement overflowed, voiding bet"
            );
            session.void_pending();
            return None;
        };

        let result = SettlementResult {
            bet_id: bet.bet_id,
            chosen_side: bet.side,
            outcome_side,
            won,
            stake: bet.stake,
            balance_before,
            new_balance,
            currency: bet.currency,
            settled_at: Utc::now(),
        };
        session.settle(result.clone());

        info!(
            session_id = %session.id(),
            bet_id = %result.bet_id,
            outcome = %outcome_side,
            won,
            balance = %new_balance,
            "Flip settled"
        );

        Some(result)
    }

    /// Void the pending bet without drawing. Balance and stats are untouched.
    pub fn cancel_pending(&self, session: &mut WagerSession) -> Option<PendingBet> {
        if session.phase() != Phase::Flipping {
            return None;
        }
        let bet = session.void_pending();
        if let Some(ref b) = bet {
            warn!(session_id = %session.id(), bet_id = %b.bet_id, "Pending flip cancelled");
        }
        bet
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
