//! Account authentication.
//!
//! Defines the `Authenticator` trait and the sign-in/registration flows
//! that validate a form before anything touches the network. The HTTP
//! implementation lives in `client`. Authentication never interacts with
//! wager state: a failed login is reported to the player and nothing else.

pub mod client;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use tracing::{info, warn};

use crate::forms::{FormErrors, LoginForm, RegistrationForm};

pub use client::HttpAuthClient;

/// Body returned by the login and signup endpoints.
///
/// The backend answers with a token, a user object, or both.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AuthResponse {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() || self.user.is_some()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid form: {0}")]
    Invalid(#[from] FormErrors),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),
}

impl AuthError {
    /// Text suitable for showing to the player.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Invalid(errors) => errors.to_string(),
            AuthError::Network(_) => "Unable to reach the server. Please try again.".to_string(),
            AuthError::Rejected { message, .. } => message.clone(),
            AuthError::Decode(_) => "Unexpected response from the server.".to_string(),
        }
    }
}

/// Remote account service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials for a token and/or user record.
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, AuthError>;

    /// Create an account.
    async fn signup(&self, form: &RegistrationForm) -> Result<AuthResponse, AuthError>;
}

/// Validate the login form, then log in. An invalid form never reaches the network.
pub async fn sign_in(auth: &dyn Authenticator, form: &LoginForm) -> Result<AuthResponse, AuthError> {
    form.validate()?;

    let identifier = form.identifier.trim();
    info!(identifier, remember_me = form.remember_me, "Signing in");

    match auth.login(identifier, &form.password).await {
        Ok(resp) => {
            info!(identifier, authenticated = resp.is_authenticated(), "Sign-in complete");
            Ok(resp)
        }
        Err(e) => {
            warn!(identifier, error = %e, "Sign-in failed");
            Err(e)
        }
    }
}

/// Validate the registration form, then sign up.
pub async fn register(
    auth: &dyn Authenticator,
    form: &RegistrationForm,
) -> Result<AuthResponse, AuthError> {
    form.validate()?;

    info!(email = %form.email, "Registering account");
    let result = auth.signup(form).await;
    if let Err(ref e) = result {
        warn!(email = %form.email, error = %e, "Registration failed");
    }
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
