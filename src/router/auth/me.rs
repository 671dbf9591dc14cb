use axum::{Extension, Json, extract::State};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::router::{Success, Valid};
use crate::user::User;

#[derive(Debug, Serialize, Deserialize)]
pub struct Data {
    pub user: User,
}

/// Handler to read the authenticated profile.
pub async fn handler(Extension(user): Extension<User>) -> Json<Success<Data>> {
    Json(Success::data(Data { user }))
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateBody {
    #[validate(length(
        min = 2,
        max = 50,
        message = "Name must be between 2 and 50 characters."
    ))]
    pub name: Option<String>,
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Please provide a valid phone number."
    ))]
    pub phone: Option<String>,
}

/// Handler to update editable profile fields.
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Valid(body): Valid<UpdateBody>,
) -> Result<Json<Success<Data>>> {
    let user = state
        .db
        .users()
        .update_profile(user.id, body.name.as_deref(), body.phone.as_deref())
        .await?
        .ok_or(ServerError::UserNotFound)?;

    Ok(Json(
        Success::data(Data { user })
            .with_message("Profile updated successfully."),
    ))
}
