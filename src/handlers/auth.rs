use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info, warn};

use crate::models::{api_error, ApiError, AuthResponse, Identity, LoginRequest, RegisterRequest};
use crate::services::auth_service::{self, MIN_PASSWORD_LEN};
use crate::state::AppState;
use crate::stores::StoreError;

/// Register a new user and hand back a token
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Username and email are required"));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }

    // bcrypt is CPU bound and the runtime is single threaded
    let password = request.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || auth_service::hash_password(&password))
        .await
        .map_err(|e| {
            error!("Password hashing task failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?
        .map_err(|e| {
            error!("Password hashing failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?;

    let identity = match state.stores.identities.register(username, email, &password_hash).await {
        Ok(identity) => identity,
        Err(StoreError::Conflict(detail)) => {
            warn!("Registration refused: {}", detail);
            return Err(api_error(StatusCode::BAD_REQUEST, "User already exists"));
        }
        Err(e) => {
            error!("Registration failed: {}", e);
            return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error"));
        }
    };

    info!("Registered user {}", identity.username);
    respond_with_token(&state, &identity)
}

/// Login with email or username
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let identity = state
        .stores
        .identities
        .find_by_login(request.identity.trim())
        .await
        .map_err(|e| {
            error!("Login lookup failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Invalid credentials"))?;

    let password = request.password.clone();
    let hash = identity.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || auth_service::verify_password(&password, &hash))
        .await
        .map_err(|e| {
            error!("Password verification task failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?
        .map_err(|e| {
            error!("Password verification error: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?;
    if !valid {
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid credentials"));
    }

    respond_with_token(&state, &identity)
}

fn respond_with_token(state: &AppState, identity: &Identity) -> Result<Json<AuthResponse>, ApiError> {
    let Some(secret) = state.config.jwt_secret.as_deref() else {
        error!("Cannot issue a token: no JWT secret configured");
        return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error"));
    };
    let token = auth_service::issue_token(identity, secret, state.config.token_ttl_days)
        .map_err(|e| {
            error!("Token generation failed: {}", e);
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Server error")
        })?;
    Ok(Json(AuthResponse { token, user: identity.to_response() }))
}
