use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{error, info};
use uuid::Uuid;

use crate::models::api_error;
use crate::services::auth_service::{get_auth_token, validate_jwt};
use crate::state::AppState;

/// Caller identity attached to the request by `auth_middleware`
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {

    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(e) => return api_error(StatusCode::UNAUTHORIZED, e).into_response(),
    };

    // 2. Validate Token
    let Some(secret) = state.config.jwt_secret.as_deref() else {
        error!("Cannot verify tokens: no JWT secret configured");
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Authentication is not configured").into_response();
    };
    let token_data = match validate_jwt(&token, secret) {
        Ok(token_data) => token_data,
        Err(e) => {
            error!("Token verification error: {}", e);
            let message = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => "Token expired",
                _ => "Invalid token",
            };
            return api_error(StatusCode::UNAUTHORIZED, message).into_response();
        }
    };

    // 3. Extract the user id
    let id = match Uuid::parse_str(&token_data.claims.sub) {
        Ok(id) => id,
        Err(_) => {
            error!("JWT token 'sub' claim is not a user id");
            return api_error(StatusCode::UNAUTHORIZED, "Malformed token").into_response();
        }
    };
    info!("User token validated successfully for {}", token_data.claims.username);

    // 4. Set the caller into request extensions for downstream handlers
    req.extensions_mut().insert(AuthUser { id, username: token_data.claims.username });

    next.run(req).await
}
