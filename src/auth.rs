//! Bearer-token authentication and password hashing.
//!
//! Access tokens are HS256 JWTs carrying the user's hex id and role. Password
//! hashes are Argon2id PHC strings, so the salt and parameters travel with
//! the hash.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::config::JwtSettings;
use crate::error::BookingError;
use crate::models::user_model::Role;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Hex id of the user.
    pub sub: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

pub fn issue_token(
    user_id: ObjectId,
    role: Role,
    settings: &JwtSettings,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_hex(),
        role,
        exp: now + settings.expiry_mins * 60,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )
}

pub fn validate_token(
    token: &str,
    settings: &JwtSettings,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on a wrong password; `Err` only for a malformed stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// The caller identified by the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: ObjectId,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BookingError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let jwt = parts
            .extensions
            .get::<AppState>()
            .map(|state| state.config.jwt.clone())
            .ok_or_else(|| BookingError::Internal("application state is not installed".into()))?;

        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| BookingError::Unauthorized("Missing Authorization header".into()))?;
        let token = header_value.strip_prefix("Bearer ").ok_or_else(|| {
            BookingError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            )
        })?;

        let claims = validate_token(token, &jwt)
            .map_err(|_| BookingError::Unauthorized("Invalid or expired token".into()))?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| BookingError::Unauthorized("Invalid or expired token".into()))?;

        Ok(AuthUser { user_id })
    }
}
