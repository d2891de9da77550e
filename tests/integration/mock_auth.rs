//! Mock account service for integration testing.
//!
//! Provides a deterministic `Authenticator` implementation that keeps
//! registered accounts in memory and records every call, with no network.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use coinflip::auth::{self, AuthError, AuthResponse, Authenticator};
use coinflip::forms::{LoginForm, RegistrationForm};

/// An in-memory account service.
#[derive(Default, Clone)]
pub struct MockAccounts {
    /// email -> password
    accounts: Arc<Mutex<HashMap<String, String>>>,
    calls: Arc<Mutex<Vec<String>>>,
    /// If set, every call fails with this status and message.
    force_error: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockAccounts {
    pub fn with_account(email: &str, password: &str) -> Self {
        let mock = Self::default();
        mock.accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
        mock
    }

    pub fn set_error(&self, status: u16, msg: &str) {
        *self.force_error.lock().unwrap() = Some((status, msg.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn check_forced(&self) -> Result<(), AuthError> {
        match self.force_error.lock().unwrap().clone() {
            Some((status, message)) => Err(AuthError::Rejected { status, message }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Authenticator for MockAccounts {
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, AuthError> {
        self.calls.lock().unwrap().push(format!("login:{email}"));
        self.check_forced()?;

        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some(stored) if stored == password.expose_secret() => Ok(AuthResponse {
                token: Some(format!("token-for-{email}")),
                user: Some(serde_json::json!({ "email": email })),
                message: None,
            }),
            _ => Err(AuthError::Rejected {
                status: 401,
                message: "Invalid email or password".to_string(),
            }),
        }
    }

    async fn signup(&self, form: &RegistrationForm) -> Result<AuthResponse, AuthError> {
        self.calls.lock().unwrap().push(format!("signup:{}", form.email));
        self.check_forced()?;

        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&form.email) {
            return Err(AuthError::Rejected {
                status: 409,
                message: "Email already registered".to_string(),
            });
        }
        accounts.insert(
            form.email.clone(),
            form.password.expose_secret().to_string(),
        );
        Ok(AuthResponse {
            message: Some("Account created".to_string()),
            user: Some(serde_json::json!({ "email": form.email })),
            ..AuthResponse::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_register_then_sign_in() {
    let accounts = MockAccounts::default();

    let form = RegistrationForm::new("player@example.com", "+91", "9876543210", "secret1", "secret1");
    let created = auth::register(&accounts, &form).await.unwrap();
    assert!(created.is_authenticated());

    let login = LoginForm::new("player@example.com", "secret1");
    let resp = auth::sign_in(&accounts, &login).await.unwrap();
    assert_eq!(resp.token.as_deref(), Some("token-for-player@example.com"));

    assert_eq!(
        accounts.calls(),
        vec!["signup:player@example.com", "login:player@example.com"]
    );
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let accounts = MockAccounts::with_account("player@example.com", "secret1");
    let login = LoginForm::new("player@example.com", "secret2");
    let err = auth::sign_in(&accounts, &login).await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid email or password");
}

#[tokio::test]
async fn test_duplicate_signup_rejected() {
    let accounts = MockAccounts::with_account("player@example.com", "secret1");
    let form = RegistrationForm::new("player@example.com", "+61", "4123456", "secret9", "secret9");
    let err = auth::register(&accounts, &form).await.unwrap_err();
    assert!(matches!(err, AuthError::Rejected { status: 409, .. }));
}

#[tokio::test]
async fn test_invalid_form_never_calls_service() {
    let accounts = MockAccounts::default();
    let err = auth::sign_in(&accounts, &LoginForm::new("", "")).await.unwrap_err();
    assert!(matches!(err, AuthError::Invalid(_)));
    assert!(accounts.calls().is_empty());
}

#[tokio::test]
async fn test_forced_outage() {
    let accounts = MockAccounts::with_account("player@example.com", "secret1");
    accounts.set_error(503, "Service unavailable");
    let err = auth::sign_in(&accounts, &LoginForm::new("player@example.com", "secret1"))
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Service unavailable");
}
