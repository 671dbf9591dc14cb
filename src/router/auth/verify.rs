use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::otp::{self, OtpError};
use crate::router::{Success, Valid, normalize_email};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(custom(
        function = "crate::router::validate_otp",
        message = "OTP must be 6 digits."
    ))]
    pub otp: String,
}

/// Handler to verify an account with its emailed code.
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

    if user.is_verified {
        return Err(ServerError::AlreadyVerified);
    }

    let code = body.otp.trim();
    otp::validate(code, user.otp.as_deref(), user.otp_expiry, Utc::now())?;

    // Compare-and-clear happens in one statement: if a concurrent resend
    // swapped the code between the read above and this update, no row
    // matches and the stale submission is rejected instead of consuming
    // the newer code.
    if !users.mark_verified(user.id, code).await? {
        return Err(OtpError::InvalidCode.into());
    }

    Ok(Json(Success::message("Account verified successfully.")))
}
