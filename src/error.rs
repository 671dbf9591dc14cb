//! Error handler for tiffin.

use axum::extract::rejection::JsonRejection;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::crypto::CryptoError;
use crate::otp::OtpError;
use crate::token::TokenError;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Axum(#[from] JsonRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("user not found")]
    UserNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account not verified")]
    Unverified,

    #[error("account already verified")]
    AlreadyVerified,

    #[error("account has been deactivated")]
    Deactivated,

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("missing or invalid 'Authorization' header")]
    Unauthorized,

    #[error("mail event not published: {0}")]
    Delivery(#[from] lapin::Error),

    #[error("URL is invalid: {0}")]
    Url(#[from] url::ParseError),

    #[error("mail broker scheme must be amqp or amqps")]
    InvalidScheme,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("internal server error, {details}")]
    Internal { details: String },
}

/// Structure for enveloped error responses.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    success: bool,
    error: ErrorBody,
    #[serde(skip)]
    status: u16,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<FieldError>>,
}

impl ResponseError {
    /// Update error status code.
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code.as_u16();
        self
    }

    /// Update machine-readable error code.
    pub fn code(mut self, code: &'static str) -> Self {
        self.error.code = code;
        self
    }

    /// Update human-readable message.
    pub fn message(mut self, message: &str) -> Self {
        self.error.message = message.into();
        self
    }

    /// Automatically add `details` field.
    pub fn details(mut self, errors: &ValidationErrors) -> Self {
        self.error.details = Some(parse_validation_errors(errors));
        self
    }

    /// Transform [`ResponseError`] into axum [`Response`].
    pub fn into_response(self) -> std::result::Result<Response, axum::http::Error> {
        if let Ok(body) = serde_json::to_string(&self) {
            Response::builder()
                .status(self.status)
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
        } else {
            Ok(internal_server_error())
        }
    }
}

impl Default for ResponseError {
    fn default() -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: "SERVER_001",
                message: "Internal server error.".to_owned(),
                details: None,
            },
            status: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FieldError {
    field: String,
    message: String,
}

fn parse_validation_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, issues)| {
            issues.iter().map(move |issue| FieldError {
                field: field.to_string(),
                message: issue.to_string(),
            })
        })
        .collect()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let response = ResponseError::default();

        let response = match &self {
            ServerError::Validation(validation_errors) => response
                .status(StatusCode::BAD_REQUEST)
                .code("VALIDATION_001")
                .message("Validation failed.")
                .details(validation_errors),

            ServerError::Axum(err) => response
                .status(StatusCode::BAD_REQUEST)
                .code("VALIDATION_001")
                .message(&err.to_string()),

            ServerError::DuplicateEmail => response
                .status(StatusCode::CONFLICT)
                .code("DUPLICATE_001")
                .message("Email already registered."),

            ServerError::UserNotFound => response
                .status(StatusCode::NOT_FOUND)
                .code("USER_001")
                .message("User not found."),

            ServerError::InvalidCredentials => response
                .status(StatusCode::UNAUTHORIZED)
                .code("AUTH_001")
                .message("Invalid credentials."),

            ServerError::Unverified => response
                .status(StatusCode::FORBIDDEN)
                .code("AUTH_002")
                .message("Account not verified."),

            ServerError::AlreadyVerified => response
                .status(StatusCode::BAD_REQUEST)
                .code("VERIFICATION_001")
                .message("Account already verified."),

            ServerError::Deactivated => response
                .status(StatusCode::FORBIDDEN)
                .code("AUTH_005")
                .message("Account has been deactivated."),

            ServerError::Otp(err) => response
                .status(StatusCode::BAD_REQUEST)
                .code("AUTH_003")
                .message(&err.to_string()),

            ServerError::Token(TokenError::Expired) => response
                .status(StatusCode::UNAUTHORIZED)
                .code("AUTH_004")
                .message("Token has expired."),

            ServerError::Token(TokenError::Invalid) => response
                .status(StatusCode::UNAUTHORIZED)
                .code("AUTH_004")
                .message("Invalid token."),

            ServerError::Unauthorized => response
                .status(StatusCode::UNAUTHORIZED)
                .code("AUTH_004")
                .message("Access denied. No token provided."),

            ServerError::Delivery(err) => {
                tracing::error!(error = %err, "mail delivery failed");

                response
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .code("EMAIL_003")
                    .message("Failed to send OTP email.")
            },

            // Internal faults answer a generic envelope: no raw detail
            // crosses the boundary.
            ServerError::Sql(err) => {
                tracing::error!(error = %err, "server returned 500 status");

                ResponseError::default()
            },

            ServerError::Internal { details } => {
                tracing::error!(%details, "server returned 500 status");

                ResponseError::default()
            },

            _ => {
                tracing::error!(error = %self, "server returned 500 status");

                ResponseError::default()
            },
        };

        response
            .into_response()
            .unwrap_or_else(|_| internal_server_error())
    }
}

fn internal_server_error() -> Response {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(header::CONTENT_TYPE, "application/json")
        .body(
            serde_json::json!({
                "success": false,
                "error": {
                    "code": "SERVER_001",
                    "message": "Internal server error.",
                },
            })
            .to_string()
            .into(),
        )
        .unwrap_or_else(|_| Response::new("Internal server error".into()))
}
