//! Core engine: coin sources, bet validation and settlement, and the
//! timer-driven table that ties them together.

pub mod coin;
pub mod settlement;
pub mod table;
pub mod wager;

pub use coin::{CoinSource, FairCoin, ScriptedCoin};
pub use settlement::SettlementHandle;
pub use table::FlipTable;
pub use wager::WagerEngine;
