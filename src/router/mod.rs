//! HTTP routes.

pub mod auth;

use std::sync::LazyLock;

use axum::Json;
use axum::extract::{FromRequest, Request};
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::ServerError;

static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 \-]{4,19}$").unwrap());
static OTP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{6}$").unwrap());

/// Phone numbers: optional leading `+`, then digits with spaces or
/// dashes.
pub(crate) fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if PHONE.is_match(phone.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("phone")
            .with_message("Please provide a valid phone number.".into()))
    }
}

/// Codes are exactly six ASCII digits, transported as a string to keep
/// leading zeros.
pub(crate) fn validate_otp(code: &str) -> Result<(), ValidationError> {
    if OTP.is_match(code.trim()) {
        Ok(())
    } else {
        Err(ValidationError::new("otp")
            .with_message("OTP must be 6 digits.".into()))
    }
}

/// Lowercased, trimmed form used for storage and every lookup.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// JSON body extractor running `validator` checks before the handler.
pub struct Valid<T>(pub T);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(Valid(value))
    }
}

/// Response envelope shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl Success<()> {
    /// Envelope carrying a message and no data.
    pub fn message(message: &str) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

impl<T> Success<T> {
    /// Envelope carrying data.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    /// Attach a message.
    pub fn with_message(mut self, message: &str) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Application state for handler tests.
#[cfg(test)]
pub(crate) fn state(pool: sqlx::Pool<sqlx::Postgres>) -> crate::AppState {
    use std::sync::Arc;

    // Cheap Argon2 parameters, tests only.
    let argon2 = crate::config::Argon2 {
        memory_cost: 8 * 1024,
        iterations: 1,
        parallelism: 1,
        hash_length: 32,
    };

    crate::AppState {
        config: Arc::new(crate::config::Configuration::default()),
        db: crate::database::Database { postgres: pool },
        crypto: Arc::new(
            crate::crypto::PasswordManager::new(Some(argon2))
                .expect("argon2 parameters"),
        ),
        token: crate::token::TokenManager::new("test-secret", None),
        mail: crate::mail::MailManager::default(),
        otp: crate::otp::OtpGenerator::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+33 6 12 34 56 78").is_ok());
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("+").is_err());
    }

    #[test]
    fn test_validate_otp() {
        assert!(validate_otp("048213").is_ok());
        assert!(validate_otp(" 048213 ").is_ok());
        assert!(validate_otp("48213").is_err());
        assert!(validate_otp("0482134").is_err());
        assert!(validate_otp("o48213").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" User@X.COM "), "user@x.com");
    }

    #[test]
    fn test_success_envelope_shape() {
        let body =
            serde_json::to_value(Success::message("Login successful."))
                .unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Login successful.");
        assert!(body.get("data").is_none());
    }
}
