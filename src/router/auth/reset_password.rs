use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::otp::{self, OtpError};
use crate::router::{Success, Valid, normalize_email};

#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(custom(
        function = "crate::router::validate_otp",
        message = "OTP must be 6 digits."
    ))]
    pub otp: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub new_password: String,
}

fn password_reuse() -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    errors.add(
        "newPassword",
        ValidationError::new("password_reuse").with_message(
            "New password must be different from the current one.".into(),
        ),
    );
    errors
}

/// Handler to set a new password from a reset code.
///
/// The code and its expiry are checked again here, never trusted from an
/// earlier pre-check call.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Success<()>>> {
    let email = normalize_email(&body.email);
    let users = state.db.users();

    let user = users
        .find_by_email_with_secrets(&email)
        .await?
        .ok_or(ServerError::UserNotFound)?;

    let code = body.otp.trim();
    otp::validate(code, user.otp.as_deref(), user.otp_expiry, Utc::now())?;

    let stored_hash = user.password.as_deref().unwrap_or_default();
    if state.crypto.verify_password(&body.new_password, stored_hash) {
        return Err(password_reuse().into());
    }

    let password_hash = state.crypto.hash_password(&body.new_password)?;
    if !users.update_password(user.id, code, &password_hash).await? {
        return Err(OtpError::InvalidCode.into());
    }

    Ok(Json(Success::message("Password reset successfully.")))
}
