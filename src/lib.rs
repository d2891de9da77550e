//! COINFLIP: single-player coin-flip wager engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the terminal entry point.

pub mod config;
pub mod types;
pub mod session;
pub mod engine;
pub mod forms;
pub mod auth;
pub mod recovery;
pub mod cashier;
