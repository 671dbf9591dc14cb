use axum::{Json, extract::State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use crate::error::{Result, ServerError};
use crate::otp;
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

/// Handler to pre-check a password reset code.
///
/// The challenge deliberately stays in place: the same code must remain
/// valid through the reset-password call that follows, which re-validates
/// it anyway.
pub async fn handler(
    State(state): State<AppState>,
    Valid(body): Valid<Body>,
) -> Result<Json<Success<()>>> {
    let email = normalize_email(&body.email);

    let user = state
        .db
        .users()
        .find_by_email_with_secrets(&email)
        .await?
        .ok_or(ServerError::UserNotFound)?;

    otp::validate(
        body.otp.trim(),
        user.otp.as_deref(),
        user.otp_expiry,
        Utc::now(),
    )?;

    Ok(Json(Success::message("OTP verified successfully.")))
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::*;
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;
    use sqlx::{Pool, Postgres};

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_verify_reset_otp_is_non_destructive(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());

        sqlx::query(
            "UPDATE users SET otp = '734521', otp_expiry = NOW() + interval '10 minutes'
                WHERE email = 'alice@tiffin.dev'",
        )
        .execute(&pool)
        .await
        .unwrap();

        let body = json!({ "email": "alice@tiffin.dev", "otp": "734521" });
        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/auth/verify-password-reset-otp",
            body.to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Challenge survives the pre-check.
        let otp: Option<String> = sqlx::query_scalar(
            "SELECT otp FROM users WHERE email = 'alice@tiffin.dev'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(otp.as_deref(), Some("734521"));

        // So the pre-check can be repeated before the actual reset.
        let response = make_request(
            app(state),
            Method::POST,
            "/auth/verify-password-reset-otp",
            body.to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Forgot-password flow with an expired code.
    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_verify_reset_otp_expired(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        // `carol` holds the fixture challenge "591002", expired a minute
        // ago.
        let response = make_request(
            app,
            Method::POST,
            "/auth/verify-password-reset-otp",
            json!({ "email": "carol@tiffin.dev", "otp": "591002" })
                .to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "AUTH_003");
        assert_eq!(body["error"]["message"], "OTP expired");
    }

    #[sqlx::test(fixtures("../../../fixtures/users.sql"))]
    async fn test_verify_reset_otp_without_challenge(pool: Pool<Postgres>) {
        let state = router::state(pool);
        let app = app(state);

        // `alice` has no challenge stored in the fixtures.
        let response = make_request(
            app,
            Method::POST,
            "/auth/verify-password-reset-otp",
            json!({ "email": "alice@tiffin.dev", "otp": "123456" })
                .to_string(),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "AUTH_003");
    }
}
