use axum::http;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::models::Identity;

/// bcrypt cost used for stored password hashes
pub const PASSWORD_HASH_COST: u32 = 10;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        return Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string());
    }

    // 2. Try the x-auth-token header
    if let Some(header) = req.headers().get("x-auth-token") {
        return header
            .to_str()
            .map(str::to_string)
            .map_err(|_| "Invalid x-auth-token header".to_string());
    }

    // 3. Try to get token from cookies
    if let Some(cookie_header) = req.headers().get(http::header::COOKIE) {
        let cookie_header = cookie_header.to_str().map_err(|_| "Invalid Cookie header".to_string())?;
        for cookie in cookie::Cookie::split_parse(cookie_header).flatten() {
            if cookie.name() == "token" || cookie.name() == "auth_token" {
                return Ok(cookie.value().to_string());
            }
        }
    }

    // 4. Finally the query string
    req.uri()
        .query()
        .and_then(|query| {
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "token")
                .map(|(_, value)| value.to_string())
        })
        .ok_or_else(|| "Authentication required: No token provided".to_string())
}

// Issue a signed token for a user
pub fn issue_token(identity: &Identity, secret: &str, ttl_days: i64) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: identity.id.to_string(),
        username: identity.username.clone(),
        exp: (now + Duration::days(ttl_days)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &validation)
}

pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, PASSWORD_HASH_COST)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn alice() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: String::new(),
        }
    }

    fn request(header: Option<(&str, &str)>, uri: &str) -> http::Request<()> {
        let mut builder = http::Request::builder().uri(uri);
        if let Some((name, value)) = header {
            builder = builder.header(name, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let identity = alice();
        let token = issue_token(&identity, "secret", 7).unwrap();

        let data = validate_jwt(&token, "secret").unwrap();
        assert_eq!(data.claims.sub, identity.id.to_string());
        assert_eq!(data.claims.username, "alice");
        assert!(validate_jwt(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = issue_token(&alice(), "secret", -1).unwrap();
        assert!(validate_jwt(&token, "secret").is_err());
    }

    #[test]
    fn token_sources_in_priority_order() {
        assert_eq!(get_auth_token(&request(Some(("authorization", "Bearer abc")), "/")).unwrap(), "abc");
        assert_eq!(get_auth_token(&request(Some(("x-auth-token", "def")), "/")).unwrap(), "def");
        assert_eq!(get_auth_token(&request(Some(("cookie", "a=1; token=ghi")), "/")).unwrap(), "ghi");
        assert_eq!(get_auth_token(&request(None, "/api/rooms?x=1&token=jkl")).unwrap(), "jkl");
        assert!(get_auth_token(&request(None, "/api/rooms")).is_err());
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }
}
