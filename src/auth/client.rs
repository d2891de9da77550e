//! HTTP account client.
//!
//! Talks to the account backend: `POST {base_url}/auth/login` and
//! `POST {base_url}/auth/signup`, JSON in and out.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{AuthError, AuthResponse, Authenticator};
use crate::config::AuthConfig;
use crate::forms::RegistrationForm;

const USER_AGENT: &str = concat!("COINFLIP/", env!("CARGO_PKG_VERSION"));

pub struct HttpAuthClient {
    http: Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(cfg: &AuthConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client for account service")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<AuthResponse, AuthError> {
        let url = self.endpoint(path);
        debug!(url = %url, "POST");

        let resp = self.http.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status.as_u16(), &text),
            });
        }

        let text = resp.text().await?;
        serde_json::from_str(&text).map_err(|e| AuthError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Authenticator for HttpAuthClient {
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, AuthError> {
        let body = json!({
            "email": email,
            "password": password.expose_secret(),
        });
        self.post("auth/login", body).await
    }

    async fn signup(&self, form: &RegistrationForm) -> Result<AuthResponse, AuthError> {
        let body = json!({
            "email": form.email.trim(),
            "phone": form.full_phone(),
            "password": form.password.expose_secret(),
            "confirmPassword": form.confirm_password.expose_secret(),
        });
        self.post("auth/signup", body).await
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Best human-readable message from an error response body.
fn rejection_message(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(msg) = parsed.message.or(parsed.error) {
            return msg;
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed.starts_with('<') {
        format!("Request failed with status {status}")
    } else {
        trimmed.to_string()
    }
}
