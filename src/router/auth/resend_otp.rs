use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::mail::Template::Verification;
use crate::router::{Success, Valid, normalize_email};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
}

/// Handler to re-send a verification code.
///
/// The fresh challenge replaces the stored one, so the previously emailed
/// code stops validating even if it was still alive.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Success<()>>> {
    let email = normalize_email(&body.email);
    let users = state.db.users();

    let user = users
        .find_by_email(&email)
        .await?
        .ok_or(ServerError::UserNotFound)?;

    if user.is_verified {
        return Err(ServerError::AlreadyVerified);
    }

    let challenge = state.otp.issue(chrono::Utc::now());
    users.set_challenge(user.id, &challenge).await?;

    // Unlike registration, failed delivery fails the call: this endpoint
    // is the user's only remaining path to a code.
    state
        .mail
        .send_code(Verification, &user.email, &user.name, &challenge.code)
        .await?;

    Ok(Json(Success::message("OTP sent successfully.")))
}
