use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::{Success, Valid, normalize_email};
use crate::user::User;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub token: String,
    pub user: User,
}

/// Handler to log into an account.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Success<Response>>> {
    let email = normalize_email(&body.email);
    let users = state.db.users();

    let user = users
        .find_by_email_with_secrets(&email)
        .await?
        .ok_or(ServerError::UserNotFound)?;

    if !user.is_verified {
        return Err(ServerError::Unverified);
    }
    if !user.is_active {
        return Err(ServerError::Deactivated);
    }

    let stored_hash = user.password.as_deref().unwrap_or_default();
    if !state.crypto.verify_password(&body.password, stored_hash) {
        return Err(ServerError::InvalidCredentials);
    }

    users.update_last_login(user.id).await?;
    let token = state.token.create(&user)?;

    Ok(Json(
        Success::data(Response { token, user })
            .with_message("Login successful."),
    ))
}
