//! Flip table, the driver the presentation layer talks to.
//!
//! Owns one `WagerSession` and its `WagerEngine`, accepts flips, schedules
//! their settlement after the configured delay and publishes every
//! settlement on a channel. All mutation goes through one async mutex so
//! the session sees a single sequential flow of operations.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::GameConfig;
use crate::engine::coin::CoinSource;
use crate::engine::settlement::{self, SettlementHandle};
use crate::engine::wager::WagerEngine;
use crate::session::{SessionSnapshot, WagerSession};
use crate::types::{CurrencyCode, PendingBet, SettlementResult, Side, StakeInput, WagerError};

struct TableState<C> {
    session: WagerSession,
    engine: WagerEngine<C>,
}

pub struct FlipTable<C> {
    state: Arc<Mutex<TableState<C>>>,
    settlement_delay: Duration,
    results: mpsc::UnboundedSender<SettlementResult>,
}

impl<C: CoinSource + 'static> FlipTable<C> {
    /// Build a table; the receiver yields every settlement in order.
    pub fn new(
        session: WagerSession,
        engine: WagerEngine<C>,
        settlement_delay: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SettlementResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let table = Self {
            state: Arc::new(Mutex::new(TableState { session, engine })),
            settlement_delay,
            results: tx,
        };
        (table, rx)
    }

    /// Fresh session and engine from the game configuration.
    pub fn from_config(
        cfg: &GameConfig,
        coin: C,
    ) -> (Self, mpsc::UnboundedReceiver<SettlementResult>) {
        let session = WagerSession::new(cfg.initial_balance, cfg.default_currency);
        let engine = WagerEngine::new(coin, cfg.minimum_stake);
        info!(
            session_id = %session.id(),
            balance = %cfg.initial_balance,
            currency = %cfg.default_currency,
            delay_ms = cfg.settlement_delay_ms,
            "Table opened"
        );
        Self::new(session, engine, cfg.settlement_delay())
    }

    pub fn settlement_delay(&self) -> Duration {
        self.settlement_delay
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.lock().await.session.snapshot()
    }

    /// Read the session under the lock.
    pub async fn with_session<R>(&self, f: impl FnOnce(&WagerSession) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.session)
    }

    pub async fn minimum_stake(&self) -> rust_decimal::Decimal {
        let state = self.state.lock().await;
        state.engine.minimum_for(&state.session)
    }

    pub async fn select_side(&self, side: Side) -> Result<(), WagerError> {
        self.state.lock().await.session.select_side(side)
    }

    pub async fn select_currency(&self, code: CurrencyCode) -> Result<(), WagerError> {
        self.state.lock().await.session.select_currency(code)
    }

    /// Edit the stake field from raw text; the text must at least be a positive amount.
    pub async fn set_stake(&self, stake: impl Into<StakeInput>) -> Result<(), WagerError> {
        let amount = stake.into().parse()?;
        self.state.lock().await.session.set_stake(amount)
    }

    /// Place a bet and schedule its settlement.
    pub async fn flip(
        &self,
        stake: impl Into<StakeInput>,
        side: Side,
    ) -> Result<SettlementHandle, WagerError> {
        let bet = {
            let mut guard = self.state.lock().await;
            let TableState { session, engine } = &mut *guard;
            engine.place_bet(session, stake, side)?
        };
        Ok(self.schedule_settlement(bet))
    }

    /// Flip with whatever stake and side are currently selected.
    pub async fn flip_current(&self) -> Result<SettlementHandle, WagerError> {
        let bet = {
            let mut guard = self.state.lock().await;
            let TableState { session, engine } = &mut *guard;
            engine.place_current_bet(session)?
        };
        Ok(self.schedule_settlement(bet))
    }

    fn schedule_settlement(&self, bet: PendingBet) -> SettlementHandle {
        let fire_state = Arc::clone(&self.state);
        let results = self.results.clone();
        let fire = async move {
            let mut guard = fire_state.lock().await;
            let TableState { session, engine } = &mut *guard;
            let Some(result) = engine.resolve_outcome(session) else {
                return None;
            };
            if results.send(result.clone()).is_err() {
                debug!(bet_id = %result.bet_id, "No listener for settlement results");
            }
            Some(result)
        };

        let cancel_state = Arc::clone(&self.state);
        let on_cancel = async move {
            let mut guard = cancel_state.lock().await;
            let TableState { session, engine } = &mut *guard;
            engine.cancel_pending(session);
        };

        settlement::schedule(bet.bet_id, self.settlement_delay, fire, on_cancel)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::coin::ScriptedCoin;
    use crate::types::{Phase, ValidationError};
    use rust_decimal_macros::dec;

    fn table(outcomes: Vec<Side>) -> (FlipTable<ScriptedCoin>, mpsc::UnboundedReceiver<SettlementResult>) {
        let session = WagerSession::new(dec!(100), CurrencyCode::In);
        let engine = WagerEngine::new(ScriptedCoin::new(outcomes), dec!(15));
        FlipTable::new(session, engine, Duration::from_millis(10))
    }

    #[tokio::test]
    async fn test_flip_settles_after_delay() {
        let (table, mut rx) = table(vec![Side::Head]);

        let handle = table.flip("30", Side::Head).await.unwrap();
        assert_eq!(table.snapshot().await.phase, Phase::Flipping);
        assert_eq!(table.snapshot().await.balance, dec!(100));

        let result = handle.wait().await.unwrap();
        assert!(result.won);
        assert_eq!(result.new_balance, dec!(130));

        let published = rx.recv().await.unwrap();
        assert_eq!(published, result);

        let snap = table.snapshot().await;
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.balance, dec!(130));
        assert_eq!(snap.outcome_side, Some(Side::Head));
    }

    #[tokio::test]
    async fn test_second_flip_rejected_until_settled() {
        let (table, _rx) = table(vec![Side::Tail]);

        let handle = table.flip("30", Side::Head).await.unwrap();
        let err = table.flip("20", Side::Head).await.unwrap_err();
        assert_eq!(err, WagerError::FlipInProgress);
        assert_eq!(table.select_side(Side::Tail).await, Err(WagerError::FlipInProgress));
        assert_eq!(
            table.select_currency(CurrencyCode::Se).await,
            Err(WagerError::FlipInProgress)
        );

        let result = handle.wait().await.unwrap();
        assert!(!result.won);
        assert_eq!(table.snapshot().await.balance, dec!(70));

        assert!(table.flip("20", Side::Head).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_flip_schedules_nothing() {
        let (table, mut rx) = table(vec![Side::Head]);
        let err = table.flip("150", Side::Head).await.unwrap_err();
        assert!(matches!(
            err,
            WagerError::Validation(ValidationError::InsufficientBalance { .. })
        ));
        assert_eq!(table.snapshot().await.phase, Phase::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancel_voids_bet() {
        let session = WagerSession::new(dec!(100), CurrencyCode::In);
        let engine = WagerEngine::new(ScriptedCoin::always(Side::Head), dec!(15));
        let (table, mut rx) = FlipTable::new(session, engine, Duration::from_secs(30));

        let mut handle = table.flip("30", Side::Head).await.unwrap();
        assert!(handle.cancel());
        assert!(handle.wait().await.is_none());

        let snap = table.snapshot().await;
        assert_eq!(snap.phase, Phase::Idle);
        assert_eq!(snap.balance, dec!(100));
        assert_eq!(snap.stats.flips, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_flip_current_after_edits() {
        let (table, _rx) = table(vec![Side::Tail]);
        table.select_side(Side::Tail).await.unwrap();
        table.set_stake("25").await.unwrap();

        let result = table.flip_current().await.unwrap().wait().await.unwrap();
        assert_eq!(result.stake, dec!(25));
        assert!(result.won);
        assert_eq!(table.snapshot().await.balance, dec!(125));
    }

    #[tokio::test]
    async fn test_set_stake_rejects_garbage() {
        let (table, _rx) = table(vec![Side::Tail]);
        let err = table.set_stake("abc").await.unwrap_err();
        assert!(matches!(err, WagerError::Validation(ValidationError::InvalidAmount(_))));
        assert_eq!(table.snapshot().await.stake_amount, dec!(30));
    }

    #[tokio::test]
    async fn test_from_config() {
        let cfg = GameConfig {
            settlement_delay_ms: 1,
            default_currency: CurrencyCode::Se,
            ..GameConfig::default()
        };
        let (table, _rx) = FlipTable::from_config(&cfg, ScriptedCoin::always(Side::Head));
        assert_eq!(table.settlement_delay(), Duration::from_millis(1));
        assert_eq!(table.minimum_stake().await, dec!(15));

        let snap = table.snapshot().await;
        assert_eq!(snap.balance, dec!(100));
        assert_eq!(snap.currency, CurrencyCode::Se);
        assert_eq!(snap.stake_amount, dec!(300));
        assert_eq!(table.with_session(|s| s.stats().flips).await, 0);
    }
}
