//! Typed HTTP client for the auth endpoints.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::user::{Role, User};

const TIMEOUT: Duration = Duration::from_secs(30);

/// Error shape every screen consumes. Raw transport errors never leak
/// past this module.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    /// The server answered an error envelope.
    #[error("{message}")]
    Api { code: String, message: String },
    /// The request outlived the client timeout.
    #[error("network timeout")]
    Timeout,
    /// Anything else between us and the server.
    #[error("network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Machine-readable code, when the server sent one.
    pub fn code(&self) -> Option<&str> {
        match self {
            AuthError::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout
        } else {
            AuthError::Network(err.to_string())
        }
    }
}

/// Envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Collapse an envelope into either its payload or one [`AuthError`].
fn normalize<T>(envelope: Envelope<T>) -> Result<Envelope<T>, AuthError> {
    if envelope.success {
        return Ok(envelope);
    }

    let (code, message) = envelope
        .error
        .map(|err| (err.code, err.message))
        .unwrap_or_else(|| {
            ("SERVER_001".to_owned(), "An error occurred.".to_owned())
        });

    Err(AuthError::Api { code, message })
}

#[derive(Debug, Deserialize)]
pub struct RegisterData {
    pub email: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct MeData {
    pub user: User,
}

/// HTTP client for the auth API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new [`ApiClient`] against `base_url`.
    pub fn new(base_url: Url) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder().timeout(TIMEOUT).build()?;

        Ok(Self { http, base_url })
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<Envelope<T>, AuthError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| AuthError::Network(err.to_string()))?;

        // Error statuses still carry the envelope, so the body is parsed
        // either way and the code comes from there.
        let response = self.http.post(url).json(&body).send().await?;
        let envelope = response.json::<Envelope<T>>().await?;

        normalize(envelope)
    }

    fn data<T>(envelope: Envelope<T>) -> Result<T, AuthError> {
        envelope
            .data
            .ok_or_else(|| AuthError::Network("missing data field".into()))
    }

    /// `POST /auth/register`
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Option<Role>,
        phone: Option<&str>,
    ) -> Result<RegisterData, AuthError> {
        let envelope = self
            .post(
                "/auth/register",
                json!({
                    "name": name,
                    "email": email,
                    "password": password,
                    "role": role,
                    "phone": phone,
                }),
            )
            .await?;

        Self::data(envelope)
    }

    /// `POST /auth/verify`
    pub async fn verify_otp(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<(), AuthError> {
        self.post::<()>("/auth/verify", json!({ "email": email, "otp": otp }))
            .await
            .map(|_| ())
    }

    /// `POST /auth/resend-otp`
    pub async fn resend_otp(&self, email: &str) -> Result<(), AuthError> {
        self.post::<()>("/auth/resend-otp", json!({ "email": email }))
            .await
            .map(|_| ())
    }

    /// `POST /auth/login`
    pub async fn login(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LoginData, AuthError> {
        let envelope = self
            .post(
                "/auth/login",
                json!({ "email": email, "password": password }),
            )
            .await?;

        Self::data(envelope)
    }

    /// `POST /auth/forgot-password`
    pub async fn forgot_password(&self, email: &str) -> Result<(), AuthError> {
        self.post::<()>("/auth/forgot-password", json!({ "email": email }))
            .await
            .map(|_| ())
    }

    /// `POST /auth/verify-password-reset-otp`
    pub async fn verify_password_reset_otp(
        &self,
        email: &str,
        otp: &str,
    ) -> Result<(), AuthError> {
        self.post::<()>(
            "/auth/verify-password-reset-otp",
            json!({ "email": email, "otp": otp }),
        )
        .await
        .map(|_| ())
    }

    /// `POST /auth/reset-password`
    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        self.post::<()>(
            "/auth/reset-password",
            json!({
                "email": email,
                "otp": otp,
                "newPassword": new_password,
            }),
        )
        .await
        .map(|_| ())
    }

    /// `GET /auth/me`
    pub async fn me(&self, token: &str) -> Result<User, AuthError> {
        let url = self
            .base_url
            .join("/auth/me")
            .map_err(|err| AuthError::Network(err.to_string()))?;

        let response = self.http.get(url).bearer_auth(token).send().await?;
        let envelope = response.json::<Envelope<MeData>>().await?;

        Ok(Self::data(normalize(envelope)?)?.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_success_envelope() {
        let raw = r#"{
            "success": true,
            "message": "Login successful.",
            "data": { "token": "abc", "user": {
                "id": "8e6bd4d2-9070-4203-8269-8c28a4b0db9f",
                "name": "Alice",
                "email": "alice@tiffin.dev",
                "role": "mess-owner",
                "phone": null,
                "isVerified": true,
                "isActive": true,
                "lastLogin": null,
                "createdAt": "2025-06-12T00:00:00Z"
            } }
        }"#;

        let envelope: Envelope<LoginData> = serde_json::from_str(raw).unwrap();
        let envelope = normalize(envelope).unwrap();
        let data = envelope.data.unwrap();
        assert_eq!(data.token, "abc");
        assert_eq!(data.user.role, Role::MessOwner);
    }

    #[test]
    fn test_normalize_error_envelope() {
        let raw = r#"{
            "success": false,
            "error": { "code": "AUTH_003", "message": "Invalid OTP" }
        }"#;

        let envelope: Envelope<()> = serde_json::from_str(raw).unwrap();
        let err = normalize(envelope).unwrap_err();
        assert_eq!(err.code(), Some("AUTH_003"));
        assert_eq!(err.to_string(), "Invalid OTP");
    }

    #[test]
    fn test_normalize_defaults_without_error_body() {
        let envelope: Envelope<()> =
            serde_json::from_str(r#"{ "success": false }"#).unwrap();
        let err = normalize(envelope).unwrap_err();
        assert_eq!(err.code(), Some("SERVER_001"));
    }

    #[test]
    fn test_timeout_is_distinguished() {
        // Only the variant matters to screens; mapping is structural.
        let err = AuthError::Timeout;
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "network timeout");
    }
}
