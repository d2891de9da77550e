//! Password recovery and cashier scenarios driven from configuration.

use std::time::{Duration, Instant};

use coinflip::cashier::Cashier;
use coinflip::config::AppConfig;
use coinflip::forms::{
    DepositForm, ForgotPasswordForm, ResetPasswordForm, VerificationForm, WithdrawalForm,
};
use coinflip::recovery::{PasswordRecovery, RecoveryError, RecoveryStage};

fn config() -> AppConfig {
    AppConfig::parse(
        r#"
        [account]
        verification_code = "4821"
        resend_cooldown_secs = 10
        upi_id = "table@upi"
        withdrawal_processing_ms = 1
        "#,
    )
    .unwrap()
}

#[test]
fn test_recovery_with_configured_code() {
    let cfg = config();
    let mut recovery = PasswordRecovery::from_config(&cfg.account);
    let t0 = Instant::now();

    recovery
        .request_code(&ForgotPasswordForm { contact: "9876543210".into() }, t0)
        .unwrap();
    assert!(matches!(
        recovery.resend(t0 + Duration::from_secs(4)),
        Err(RecoveryError::ResendCooldown { remaining_secs: 6 })
    ));
    recovery.resend(t0 + Duration::from_secs(10)).unwrap();

    // The stock demo code is not accepted when another is configured.
    assert!(recovery.verify(&VerificationForm { code: "1234".into() }).is_err());
    recovery.verify(&VerificationForm { code: "4821".into() }).unwrap();

    let err = recovery
        .reset(&ResetPasswordForm::new("short", "short"))
        .unwrap_err();
    assert!(matches!(err, RecoveryError::Invalid(_)));
    recovery
        .reset(&ResetPasswordForm::new("longer1", "longer1"))
        .unwrap();
    assert_eq!(recovery.stage(), RecoveryStage::Complete);
}

#[tokio::test]
async fn test_cashier_round() {
    let cfg = config();
    let desk = Cashier::from_config(&cfg.account);
    assert_eq!(desk.upi_id(), "table@upi");

    let mut withdrawal = WithdrawalForm {
        name: "A Player".into(),
        bank: "HDFC".into(),
        ifsc: "HDFC0ABC123".into(),
        account: "5566778899".into(),
        confirm_account: "5566778899".into(),
    };
    let receipt = desk.submit_withdrawal(&mut withdrawal).await.unwrap();
    assert_eq!(receipt.account, "******8899");
    assert_eq!(withdrawal, WithdrawalForm::default());

    // Submitting the now-empty form fails validation.
    assert!(desk.submit_withdrawal(&mut withdrawal).await.is_err());

    let mut deposit = DepositForm::default();
    assert!(desk.submit_deposit(&deposit).is_err());
    deposit.attach("upi-proof.jpg");
    assert_eq!(desk.submit_deposit(&deposit).unwrap().upi_id, "table@upi");
}
