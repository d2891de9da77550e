//! End-to-end table scenarios.
//!
//! Drives a `FlipTable` built from configuration through sequences of
//! flips with a scripted coin and checks balance, phase and statistics.

use rust_decimal_macros::dec;
use std::time::Duration;

use coinflip::config::{AppConfig, GameConfig};
use coinflip::engine::{FlipTable, ScriptedCoin, WagerEngine};
use coinflip::session::WagerSession;
use coinflip::types::{CurrencyCode, Phase, Side, ValidationError, WagerError};

fn fast_config() -> GameConfig {
    GameConfig {
        settlement_delay_ms: 5,
        ..GameConfig::default()
    }
}

#[tokio::test]
async fn test_winning_and_losing_streak() {
    let coin = ScriptedCoin::new([Side::Head, Side::Head, Side::Tail]);
    let (table, mut results) = FlipTable::from_config(&fast_config(), coin);

    for _ in 0..3 {
        table.flip("30", Side::Head).await.unwrap().wait().await.unwrap();
    }

    // 100 + 30 + 30 - 30
    let snap = table.snapshot().await;
    assert_eq!(snap.balance, dec!(130));
    assert_eq!(snap.phase, Phase::Idle);
    assert_eq!(snap.stats.flips, 3);
    assert_eq!(snap.stats.wins, 2);
    assert_eq!(snap.stats.losses, 1);
    assert_eq!(snap.stats.net_pnl, dec!(30));
    assert_eq!(snap.stats.peak_balance, dec!(160));

    let mut published = Vec::new();
    while let Ok(r) = results.try_recv() {
        published.push(r);
    }
    assert_eq!(published.len(), 3);
    assert_eq!(published[2].balance_before, dec!(160));
    assert_eq!(published[2].new_balance, dec!(130));
}

#[tokio::test]
async fn test_bust_and_locked_out() {
    let (table, _rx) = FlipTable::from_config(&fast_config(), ScriptedCoin::always(Side::Tail));

    table.flip("100", Side::Head).await.unwrap().wait().await.unwrap();
    assert_eq!(table.snapshot().await.balance, dec!(0));

    let err = table.flip("15", Side::Head).await.unwrap_err();
    assert!(matches!(
        err,
        WagerError::Validation(ValidationError::InsufficientBalance { .. })
    ));

    let err = table.flip("10", Side::Head).await.unwrap_err();
    assert!(matches!(
        err,
        WagerError::Validation(ValidationError::BelowMinimum { .. })
    ));
}

#[tokio::test]
async fn test_concurrent_flips_only_one_accepted() {
    let session = WagerSession::new(dec!(100), CurrencyCode::Au);
    let engine = WagerEngine::new(ScriptedCoin::always(Side::Head), dec!(15));
    let (table, _rx) = FlipTable::new(session, engine, Duration::from_millis(200));
    let table = std::sync::Arc::new(table);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let t = std::sync::Arc::clone(&table);
        tasks.push(tokio::spawn(async move { t.flip("20", Side::Head).await }));
    }

    let mut accepted = Vec::new();
    let mut locked = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(handle) => accepted.push(handle),
            Err(WagerError::FlipInProgress) => locked += 1,
            Err(other) => panic!("unexpected error {other:?}"),
        }
    }
    assert_eq!(accepted.len(), 1);
    assert_eq!(locked, 7);

    let result = accepted.pop().unwrap().wait().await.unwrap();
    assert_eq!(result.new_balance, dec!(120));
    assert_eq!(table.snapshot().await.stats.flips, 1);
}

#[tokio::test]
async fn test_currency_switch_between_flips() {
    let (table, _rx) = FlipTable::from_config(&fast_config(), ScriptedCoin::always(Side::Head));

    table.select_currency(CurrencyCode::Ca).await.unwrap();
    assert_eq!(table.snapshot().await.stake_amount, dec!(30));

    // PK baseline is far above the starting balance.
    table.select_currency(CurrencyCode::Pk).await.unwrap();
    let err = table.flip_current().await.unwrap_err();
    assert!(matches!(
        err,
        WagerError::Validation(ValidationError::InsufficientBalance { .. })
    ));

    table.set_stake("50").await.unwrap();
    let result = table.flip_current().await.unwrap().wait().await.unwrap();
    assert_eq!(result.currency, CurrencyCode::Pk);
    assert_eq!(result.new_balance, dec!(150));
}

#[tokio::test]
async fn test_config_file_drives_table() {
    let cfg = AppConfig::parse(
        r#"
        [game]
        initial_balance = 500
        minimum_stake = 50
        settlement_delay_ms = 1
        default_currency = "SE"
        "#,
    )
    .unwrap();

    let (table, _rx) = FlipTable::from_config(&cfg.game, ScriptedCoin::always(Side::Tail));
    assert_eq!(table.minimum_stake().await, dec!(50));

    let err = table.flip("40", Side::Tail).await.unwrap_err();
    assert!(matches!(
        err,
        WagerError::Validation(ValidationError::BelowMinimum { .. })
    ));

    // SE baseline stake of 300 fits in a 500 balance.
    let result = table.flip_current().await.unwrap().wait().await.unwrap();
    assert!(!result.won);
    assert_eq!(result.new_balance, dec!(200));
}
