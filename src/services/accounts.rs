use std::sync::Arc;

use mongodb::bson::oid::ObjectId;

use crate::auth::{hash_password, issue_token, verify_password};
use crate::config::JwtSettings;
use crate::error::{BookingError, BookingResult};
use crate::models::user_model::{LoginRequest, Role, SignupRequest, User};
use crate::store::Store;
use crate::utils::require_text;

const MIN_PASSWORD_LEN: usize = 10;

/// Sign-up and log-in. Passwords are hashed here, before anything is stored.
#[derive(Clone)]
pub struct Accounts {
    store: Arc<dyn Store>,
    jwt: JwtSettings,
}

impl Accounts {
    pub fn new(store: Arc<dyn Store>, jwt: JwtSettings) -> Self {
        Self { store, jwt }
    }

    pub async fn signup(&self, input: SignupRequest) -> BookingResult<User> {
        let username = require_text(input.username.as_deref(), "username")?;
        let email = require_text(input.email.as_deref(), "email")?.to_lowercase();
        if !email.contains('@') {
            return Err(BookingError::InvalidRequest("email is not valid".into()));
        }
        let password = input.password.unwrap_or_default();
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(BookingError::InvalidRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(BookingError::Duplicate(format!(
                "user with email {email} already exists"
            )));
        }

        let password_hash = hash_password(&password)
            .map_err(|e| BookingError::Internal(format!("password hashing failed: {e}")))?;
        let user = User {
            id: ObjectId::new(),
            username,
            email,
            password_hash,
            role: Role::User,
            bookings: Vec::new(),
        };
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "User signed up");
        Ok(user)
    }

    /// Returns a bearer token and the user. Unknown email and wrong password
    /// fail the same way.
    pub async fn login(&self, input: LoginRequest) -> BookingResult<(String, User)> {
        let invalid = || BookingError::Unauthorized("Invalid credentials".into());

        let email = require_text(input.email.as_deref(), "email")?.to_lowercase();
        let password = input.password.ok_or_else(invalid)?;

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(invalid)?;
        let matches = verify_password(&password, &user.password_hash)
            .map_err(|e| BookingError::Internal(format!("stored password hash is unusable: {e}")))?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Rejected login");
            return Err(invalid());
        }

        let token = issue_token(user.id, user.role, &self.jwt)
            .map_err(|e| BookingError::Internal(format!("token signing failed: {e}")))?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((token, user))
    }
}
