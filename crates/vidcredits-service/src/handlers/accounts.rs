//! Registration, login and profile handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use vidcredits_core::{Registration, User};

use crate::auth::{issue_token, AuthUser};
use crate::crypto::{hash_password, verify_password};
use crate::error::ApiError;
use crate::state::AppState;

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: String,
    /// Normalized email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Current credit balance.
    pub credits: i64,
    /// Registration timestamp.
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            credits: user.balance,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Session response for register and login.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Bearer token.
    pub token: String,
    /// The user.
    pub user: UserResponse,
}

/// Register request.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Email address.
    #[serde(default)]
    pub email: String,
    /// Password, at least 6 characters.
    #[serde(default)]
    pub password: String,
    /// Display name, at least 2 characters.
    #[serde(default)]
    pub name: String,
}

/// Register a new account with the welcome bonus.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let registration = Registration::parse(&body.email, &body.password, &body.name)?;

    let password_hash = hash_password(
        &registration.password,
        &state.config.password_pepper,
        state.config.password_hash_iterations,
    );
    let user = User::new(&registration.email, &registration.name, password_hash);

    let (user, _bonus) = state.store.open_account(&user)?;
    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;

    tracing::info!(user_id = %user.id, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address.
    pub email: String,
    /// Password.
    pub password: String,
}

/// Exchange credentials for a session token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let user = state
        .store
        .find_user_by_email(&body.email)?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(
        &body.password,
        &user.password_hash,
        &state.config.password_pepper,
    ) {
        tracing::debug!(user_id = %user.id, "Login rejected");
        return Err(ApiError::InvalidCredentials);
    }

    let token = issue_token(&user, &state.config.jwt_secret, state.config.jwt_ttl_hours)?;

    Ok(Json(SessionResponse {
        token,
        user: UserResponse::from(&user),
    }))
}

/// Get the current user's profile.
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .store
        .get_user(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse::from(&user)))
}
