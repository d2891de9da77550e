//! Delayed settlement as an explicit scheduled task.
//!
//! Each accepted bet gets one spawned task that sleeps for the settlement
//! delay and then resolves the flip. The returned `SettlementHandle` can
//! await the result or cancel the task before the timer fires. Dropping
//! the handle does not cancel: once scheduled, a settlement completes.

use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use crate::types::SettlementResult;

/// Handle to one scheduled settlement.
#[derive(Debug)]
pub struct SettlementHandle {
    bet_id: Uuid,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<Option<SettlementResult>>,
}

impl SettlementHandle {
    pub fn bet_id(&self) -> Uuid {
        self.bet_id
    }

    /// Whether the task has run to completion (settled or cancelled).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Ask the task to void the bet instead of settling it.
    ///
    /// Returns `false` if the timer already fired or cancel was already sent.
    pub fn cancel(&mut self) -> bool {
        match self.cancel.take() {
            Some(tx) => {
                let delivered = tx.send(()).is_ok();
                debug!(bet_id = %self.bet_id, delivered, "Settlement cancel requested");
                delivered
            }
            None => false,
        }
    }

    /// Wait for the task. `None` means the bet was cancelled or nothing was pending.
    pub async fn wait(self) -> Option<SettlementResult> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                error!(bet_id = %self.bet_id, error = %e, "Settlement task failed");
                None
            }
        }
    }
}

/// Spawn `fire` after `delay`, or `on_cancel` if the handle cancels first.
pub(crate) fn schedule<F, C>(bet_id: Uuid, delay: Duration, fire: F, on_cancel: C) -> SettlementHandle
where
    F: Future<Output = Option<SettlementResult>> + Send + 'static,
    C: Future<Output = ()> + Send + 'static,
{
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => fire.await,
            // A dropped sender yields Err and disables this branch.
            Ok(()) = cancel_rx => {
                on_cancel.await;
                None
            }
        }
    });

    debug!(bet_id = %bet_id, delay_ms = delay.as_millis() as u64, "Settlement scheduled");

    SettlementHandle {
        bet_id,
        cancel: Some(cancel_tx),
        task,
    }
}
