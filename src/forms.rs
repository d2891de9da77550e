//! Account form validation.
//!
//! Field rules for the login, registration, password-recovery and
//! withdrawal forms. Each `validate` collects every failing field so the
//! caller can mark them all at once. Passwords are held as `SecretString`
//! and only exposed for comparison.

use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

/// Minimum length shared by every password field.
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PHONE_LEN: usize = 7;
pub const VERIFICATION_CODE_LEN: usize = 4;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All failing fields of one form submission.
#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
#[error("{}", format_errors(.0))]
pub struct FormErrors(pub Vec<FieldError>);

fn format_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl FormErrors {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Message for `field`, if it failed.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoginForm {
    /// Username or email address.
    pub identifier: String,
    pub password: SecretString,
    pub remember_me: bool,
}

impl LoginForm {
    pub fn new(identifier: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            password: SecretString::new(password.into()),
            remember_me: false,
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        // Blank means missing; the length rule counts the text as typed.
        if self.identifier.trim().is_empty() {
            errors.push("username", "Username is required");
        } else if self.identifier.chars().count() < MIN_USERNAME_LEN {
            errors.push("username", "Must be at least 3 characters");
        }

        let password = self.password.expose_secret();
        if password.is_empty() {
            errors.push("password", "Password is required");
        } else if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("password", "Must be at least 6 characters");
        }

        errors.into_result()
    }
}

// ---------------------------------------------------------------------------
// Registration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    /// Dialling prefix chosen from the country menu, e.g. "+91".
    pub country_code: String,
    pub phone: String,
    pub password: SecretString,
    pub confirm_password: SecretString,
}

impl RegistrationForm {
    pub fn new(
        email: impl Into<String>,
        country_code: impl Into<String>,
        phone: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            country_code: country_code.into(),
            phone: phone.into(),
            password: SecretString::new(password.into()),
            confirm_password: SecretString::new(confirm_password.into()),
        }
    }

    /// Phone number with its dialling prefix.
    pub fn full_phone(&self) -> String {
        format!("{} {}", self.country_code.trim(), self.phone.trim())
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if !self.email.contains('@') {
            errors.push("email", "Invalid email");
        }
        if self.phone.trim().chars().count() < MIN_PHONE_LEN {
            errors.push("phone", "Invalid phone number");
        }
        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            errors.push("password", "Password must be at least 6 characters");
        }
        if self.password.expose_secret() != self.confirm_password.expose_secret() {
            errors.push("confirm_password", "Passwords do not match");
        }

        errors.into_result()
    }
}

// ---------------------------------------------------------------------------
// Password recovery
// ---------------------------------------------------------------------------

/// Step 1: where to send the reset code.
#[derive(Debug, Clone)]
pub struct ForgotPasswordForm {
    /// Email address or phone number.
    pub contact: String,
}

impl ForgotPasswordForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        if self.contact.trim().is_empty() {
            errors.push("contact", "Please enter your email or phone number.");
        }
        errors.into_result()
    }
}

/// Step 2: the code that was sent.
#[derive(Debug, Clone)]
pub struct VerificationForm {
    pub code: String,
}

impl VerificationForm {
    pub fn validate(&self, expected: &str) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        let code = self.code.trim();
        if code.len() != VERIFICATION_CODE_LEN || !code.chars().all(|c| c.is_ascii_digit()) {
            errors.push("code", "Enter the 4-digit code");
        } else if code != expected {
            errors.push("code", "Incorrect code");
        }
        errors.into_result()
    }
}

/// Step 3: the new password. Only the first failing rule is reported.
#[derive(Debug, Clone)]
pub struct ResetPasswordForm {
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl ResetPasswordForm {
    pub fn new(new_password: impl Into<String>, confirm_password: impl Into<String>) -> Self {
        Self {
            new_password: SecretString::new(new_password.into()),
            confirm_password: SecretString::new(confirm_password.into()),
        }
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        let new_password = self.new_password.expose_secret();
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("new_password", "Password must be at least 6 characters.");
        } else if new_password != self.confirm_password.expose_secret() {
            errors.push("confirm_password", "Passwords do not match.");
        }
        errors.into_result()
    }
}

// ---------------------------------------------------------------------------
// Withdrawal
// ---------------------------------------------------------------------------

/// Bank details for a withdrawal request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WithdrawalForm {
    pub name: String,
    pub bank: String,
    pub ifsc: String,
    pub account: String,
    pub confirm_account: String,
}

impl WithdrawalForm {
    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        if self.name.trim().is_empty() {
            errors.push("name", "Name is required");
        }
        if self.bank.trim().is_empty() {
            errors.push("bank", "Bank name is required");
        }
        if !is_valid_ifsc(&self.ifsc) {
            errors.push("ifsc", "Invalid IFSC code");
        }
        if self.account.is_empty() {
            errors.push("account", "Account number required");
        }
        if self.confirm_account != self.account {
            errors.push("confirm_account", "Account numbers do not match");
        }

        errors.into_result()
    }
}

/// Indian bank branch code: four capital letters, a literal `0`, then six
/// capital letters or digits.
pub fn is_valid_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'0'
        && bytes[5..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

/// Image formats accepted as payment proof.
pub const SCREENSHOT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Proof of a UPI payment. Cannot be submitted until a screenshot is attached.
#[derive(Debug, Clone, Default)]
pub struct DepositForm {
    pub screenshot: Option<PathBuf>,
}

impl DepositForm {
    /// Attach or replace the screenshot.
    pub fn attach(&mut self, path: impl Into<PathBuf>) {
        self.screenshot = Some(path.into());
    }

    pub fn is_ready(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn validate(&self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();
        match &self.screenshot {
            None => errors.push("screenshot", "Attach a screenshot of the payment"),
            Some(path) if !is_image(path) => {
                errors.push("screenshot", "Screenshot must be a JPG or PNG image")
            }
            Some(_) => {}
        }
        errors.into_result()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SCREENSHOT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
