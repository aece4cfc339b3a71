use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::{serialize_object_id, serialize_object_ids};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    User,
    Client,
    Admin,
    Moderator,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Denormalized index of the user's bookings. Append-only.
    #[serde(default)]
    pub bookings: Vec<ObjectId>,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id", serialize_with = "serialize_object_id")]
    pub id: ObjectId,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(serialize_with = "serialize_object_ids")]
    pub bookings: Vec<ObjectId>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
            bookings: user.bookings,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SignupRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}
