use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use tower::ServiceExt;

use cinema_booking::auth::issue_token;
use cinema_booking::config::AppConfig;
use cinema_booking::models::user_model::{Role, User};
use cinema_booking::state::AppState;
use cinema_booking::store::{MemoryStore, Store};

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

pub fn test_config() -> AppConfig {
    AppConfig::from_lookup(|key| match key {
        "STORAGE_BACKEND" => Some("memory".into()),
        "APP_URL" => Some("http://localhost:5173".into()),
        "JWT_SECRET" => Some("integration-test-secret".into()),
        _ => None,
    })
    .unwrap()
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(), store.clone());
        Self { state, store }
    }

    pub fn router(&self) -> Router {
        cinema_booking::app(self.state.clone())
    }

    /// Stores a user directly and returns a bearer token for them.
    pub async fn user(&self, email: &str) -> (ObjectId, String) {
        let user = User {
            id: ObjectId::new(),
            username: email.split('@').next().unwrap_or("user").to_string(),
            email: email.to_string(),
            password_hash: "unused".to_string(),
            role: Role::User,
            bookings: Vec::new(),
        };
        self.store.insert_user(&user).await.unwrap();
        let token = issue_token(user.id, user.role, &self.state.config.jwt).unwrap();
        (user.id, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
