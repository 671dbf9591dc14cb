use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::mail::Template::PasswordReset;
use crate::router::{Success, Valid, normalize_email};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
}

/// Handler to start the password recovery flow.
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

    if !user.is_verified {
        return Err(ServerError::Unverified);
    }

    let challenge = state.otp.issue(chrono::Utc::now());
    users.set_challenge(user.id, &challenge).await?;

    // Failed delivery fails the call, same as resend: there is no other
    // way for the user to obtain the reset code.
    state
        .mail
        .send_code(PasswordReset, &user.email, &user.name, &challenge.code)
        .await?;

    Ok(Json(Success::message("Password reset code sent to your email.")))
}
