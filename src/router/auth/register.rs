use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::Result;
use crate::mail::Template::Verification;
use crate::router::{Success, Valid, normalize_email};
use crate::user::{NewUser, Role};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[validate(length(
        min = 2,
        max = 50,
        message = "Name must be between 2 and 50 characters."
    ))]
    pub name: String,
    #[validate(email(message = "Email must be formatted."))]
    pub email: String,
    #[validate(length(
        min = 8,
        max = 255,
        message = "Password must contain at least 8 characters."
    ))]
    pub password: String,
    pub role: Option<Role>,
    #[validate(custom(
        function = "crate::router::validate_phone",
        message = "Please provide a valid phone number."
    ))]
    pub phone: Option<String>,
}

#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub email: String,
    pub name: String,
    pub role: Role,
}

/// Handler to register an account.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<(StatusCode, Json<Success<Response>>)> {
    let email = normalize_email(&body.email);
    let role = body.role.unwrap_or_default();
    let password_hash = state.crypto.hash_password(&body.password)?;
    let challenge = state.otp.issue(chrono::Utc::now());

    state
        .db
        .users()
        .insert(&NewUser {
            name: &body.name,
            email: &email,
            password_hash: &password_hash,
            role,
            phone: body.phone.as_deref(),
            challenge: &challenge,
        })
        .await?;

    // Delivery is best-effort here: the account exists either way and the
    // verification screen can trigger a resend.
    if let Err(err) = state
        .mail
        .send_code(Verification, &email, &body.name, &challenge.code)
        .await
    {
        tracing::error!(%email, error = %err, "verification mail not sent");
    }

    Ok((
        StatusCode::CREATED,
        Json(
            Success::data(Response {
                email,
                name: body.name,
                role,
            })
            .with_message(
                "Registration successful. Please check your email for verification code.",
            ),
        ),
    ))
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::*;
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    #[sqlx::test]
    async fn test_register_handler(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let req_body = json!({
            "name": "Alice",
            "email": "Alice@Tiffin.DEV",
            "password": "Secret123!",
            "role": "user",
        });
        let response = make_request(
            app,
            Method::POST,
            "/auth/register",
            req_body.to_string(),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: router::Success<Response> =
            serde_json::from_slice(&body).unwrap();
        assert!(body.success);
        let data = body.data.unwrap();
        // Echoed email is the normalized (lowercase) one.
        assert_eq!(data.email, "alice@tiffin.dev");
        assert_eq!(data.name, "Alice");
        assert_eq!(data.role, user::Role::User);
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_register_duplicate_email_case_insensitive(
        pool: Pool<Postgres>,
    ) {
        let state = router::state(pool);
        let app = app(state);

        // `alice@tiffin.dev` already exists in the fixtures.
        let req_body = json!({
            "name": "Alice Again",
            "email": "ALICE@tiffin.dev",
            "password": "Secret123!",
        });
        let response = make_request(
            app,
            Method::POST,
            "/auth/register",
            req_body.to_string(),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "DUPLICATE_001");
    }

    #[sqlx::test]
    async fn test_register_short_password(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        let req_body = json!({
            "name": "Alice",
            "email": "alice@tiffin.dev",
            "password": "short",
        });
        let response = make_request(
            app,
            Method::POST,
            "/auth/register",
            req_body.to_string(),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_001");
    }
}
