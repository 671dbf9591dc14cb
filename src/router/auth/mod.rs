//! Authentication and account HTTP API.

mod forgot_password;
mod login;
mod me;
mod register;
mod resend_otp;
mod reset_password;
mod verify;
mod verify_reset_otp;

use axum::extract::{Request, State};
use axum::http::header;
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Router, middleware};

use crate::error::ServerError;
use crate::user::User;
use crate::AppState;

const BEARER: &str = "Bearer ";

/// Custom middleware for authentification: decode the bearer token, load
/// the account behind it and gate deactivated accounts.
async fn auth(
    State(state): State<AppState>,
    mut req: Request,
    next: middleware::Next,
) -> Result<Response, ServerError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix(BEARER))
        .ok_or(ServerError::Unauthorized)?;

    let claims = state.token.decode(token)?;
    let user = state
        .db
        .users()
        .find_by_id(claims.sub)
        .await?
        .ok_or(ServerError::Unauthorized)?;

    if !user.is_active {
        return Err(ServerError::Deactivated);
    }

    req.extensions_mut().insert::<User>(user);
    Ok(next.run(req).await)
}

pub fn router(state: AppState) -> Router<AppState> {
    let me_router = Router::new()
        // `GET /auth/me` goes to `me`. Authorization required.
        .route("/me", get(me::handler))
        // `PUT /auth/me` goes to `update`. Authorization required.
        .route("/me", put(me::update))
        .route_layer(middleware::from_fn_with_state(state, auth));

    Router::new()
        // `POST /auth/register` goes to `register`.
        .route("/register", post(register::handler))
        // `POST /auth/verify` goes to `verify`.
        .route("/verify", post(verify::handler))
        // `POST /auth/resend-otp` goes to `resend_otp`.
        .route("/resend-otp", post(resend_otp::handler))
        // `POST /auth/login` goes to `login`.
        .route("/login", post(login::handler))
        // `POST /auth/forgot-password` goes to `forgot_password`.
        .route("/forgot-password", post(forgot_password::handler))
        // `POST /auth/verify-password-reset-otp` goes to `verify_reset_otp`.
        .route(
            "/verify-password-reset-otp",
            post(verify_reset_otp::handler),
        )
        // `POST /auth/reset-password` goes to `reset_password`.
        .route("/reset-password", post(reset_password::handler))
        .merge(me_router)
}
