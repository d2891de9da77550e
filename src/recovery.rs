//! Password recovery flow.
//!
//! Three steps in order: ask for a code to be sent to an email or phone,
//! enter the 4-digit code, choose a new password. A code can be resent
//! only after the cooldown has run out. Each step validates its form and
//! refuses to run out of order.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::config::AccountConfig;
use crate::forms::{FormErrors, ForgotPasswordForm, ResetPasswordForm, VerificationForm};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryStage {
    RequestCode,
    EnterCode,
    ResetPassword,
    Complete,
}

impl fmt::Display for RecoveryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStage::RequestCode => write!(f, "request code"),
            RecoveryStage::EnterCode => write!(f, "enter code"),
            RecoveryStage::ResetPassword => write!(f, "reset password"),
            RecoveryStage::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecoveryError {
    #[error(transparent)]
    Invalid(#[from] FormErrors),

    #[error("step not available now: expected {expected}")]
    OutOfOrder { expected: RecoveryStage },

    #[error("resend available in {remaining_secs}s")]
    ResendCooldown { remaining_secs: u64 },
}

pub struct PasswordRecovery {
    stage: RecoveryStage,
    contact: Option<String>,
    expected_code: String,
    resend_cooldown: Duration,
    code_sent_at: Option<Instant>,
}

impl PasswordRecovery {
    pub fn new(expected_code: impl Into<String>, resend_cooldown: Duration) -> Self {
        Self {
            stage: RecoveryStage::RequestCode,
            contact: None,
            expected_code: expected_code.into(),
            resend_cooldown,
            code_sent_at: None,
        }
    }

    pub fn from_config(cfg: &AccountConfig) -> Self {
        Self::new(cfg.verification_code.clone(), cfg.resend_cooldown())
    }

    pub fn stage(&self) -> RecoveryStage {
        self.stage
    }

    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref()
    }

    /// Time left before `resend` is allowed. Zero once the cooldown has run out.
    pub fn resend_remaining(&self, now: Instant) -> Duration {
        match self.code_sent_at {
            Some(sent) => self
                .resend_cooldown
                .saturating_sub(now.saturating_duration_since(sent)),
            None => Duration::ZERO,
        }
    }

    /// Step 1. Starting over from any stage is allowed.
    pub fn request_code(
        &mut self,
        form: &ForgotPasswordForm,
        now: Instant,
    ) -> Result<(), RecoveryError> {
        form.validate()?;
        let contact = form.contact.trim().to_string();
        info!(contact = %contact, "Recovery code sent");
        self.contact = Some(contact);
        self.code_sent_at = Some(now);
        self.stage = RecoveryStage::EnterCode;
        Ok(())
    }

    /// Send the code again and restart the cooldown.
    pub fn resend(&mut self, now: Instant) -> Result<(), RecoveryError> {
        self.expect(RecoveryStage::EnterCode)?;
        let remaining = self.resend_remaining(now);
        if !remaining.is_zero() {
            // Round up so "0s" is never reported while still blocked.
            let remaining_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(RecoveryError::ResendCooldown { remaining_secs });
        }
        self.code_sent_at = Some(now);
        info!(contact = ?self.contact, "Recovery code resent");
        Ok(())
    }

    /// Step 2.
    pub fn verify(&mut self, form: &VerificationForm) -> Result<(), RecoveryError> {
        self.expect(RecoveryStage::EnterCode)?;
        if let Err(e) = form.validate(&self.expected_code) {
            warn!(contact = ?self.contact, "Recovery code rejected");
            return Err(e.into());
        }
        self.stage = RecoveryStage::ResetPassword;
        Ok(())
    }

    /// Step 3.
    pub fn reset(&mut self, form: &ResetPasswordForm) -> Result<(), RecoveryError> {
        self.expect(RecoveryStage::ResetPassword)?;
        form.validate()?;
        self.stage = RecoveryStage::Complete;
        info!(contact = ?self.contact, "Password reset");
        Ok(())
    }

    fn expect(&self, expected: RecoveryStage) -> Result<(), RecoveryError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(RecoveryError::OutOfOrder { expected })
        }
    }
}
