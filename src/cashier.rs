//! Cashier desk: withdrawal requests and deposit proofs.
//!
//! Neither touches the wager balance. A withdrawal validates the bank
//! details, waits out the processing delay, returns a receipt and clears
//! the form. A deposit needs a payment screenshot attached before it can
//! be submitted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AccountConfig;
use crate::forms::{DepositForm, FormErrors, WithdrawalForm};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithdrawalReceipt {
    pub request_id: Uuid,
    pub name: String,
    pub bank: String,
    pub ifsc: String,
    /// Account number with all but the last four digits hidden.
    pub account: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepositReceipt {
    pub request_id: Uuid,
    pub upi_id: String,
    pub screenshot: PathBuf,
    pub submitted_at: DateTime<Utc>,
}

pub struct Cashier {
    upi_id: String,
    processing_delay: Duration,
}

impl Cashier {
    pub fn new(upi_id: impl Into<String>, processing_delay: Duration) -> Self {
        Self {
            upi_id: upi_id.into(),
            processing_delay,
        }
    }

    pub fn from_config(cfg: &AccountConfig) -> Self {
        Self::new(cfg.upi_id.clone(), cfg.withdrawal_processing())
    }

    /// Where deposits are paid to.
    pub fn upi_id(&self) -> &str {
        &self.upi_id
    }

    /// Submit a withdrawal. On success the form is reset to empty; on a
    /// validation failure it is left as entered.
    pub async fn submit_withdrawal(
        &self,
        form: &mut WithdrawalForm,
    ) -> Result<WithdrawalReceipt, FormErrors> {
        if let Err(errors) = form.validate() {
            warn!(fields = errors.len(), "Withdrawal rejected");
            return Err(errors);
        }

        tokio::time::sleep(self.processing_delay).await;

        let submitted = std::mem::take(form);
        let receipt = WithdrawalReceipt {
            request_id: Uuid::new_v4(),
            name: submitted.name.trim().to_string(),
            bank: submitted.bank.trim().to_string(),
            ifsc: submitted.ifsc,
            account: mask_account(&submitted.account),
            submitted_at: Utc::now(),
        };
        info!(
            request_id = %receipt.request_id,
            bank = %receipt.bank,
            account = %receipt.account,
            "Withdrawal request submitted"
        );
        Ok(receipt)
    }

    pub fn submit_deposit(&self, form: &DepositForm) -> Result<DepositReceipt, FormErrors> {
        form.validate()?;
        let receipt = DepositReceipt {
            request_id: Uuid::new_v4(),
            upi_id: self.upi_id.clone(),
            screenshot: form.screenshot.clone().unwrap_or_default(),
            submitted_at: Utc::now(),
        };
        info!(
            request_id = %receipt.request_id,
            screenshot = %receipt.screenshot.display(),
            "Deposit proof submitted"
        );
        Ok(receipt)
    }
}

/// `"000111222333"` -> `"********2333"`.
pub fn mask_account(account: &str) -> String {
    let chars: Vec<char> = account.trim().chars().collect();
    let visible = chars.len().min(4);
    let hidden = chars.len() - visible;
    std::iter::repeat('*')
        .take(hidden)
        .chain(chars[hidden..].iter().copied())
        .collect()
}
