use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::Json,
};

use super::body;
use crate::error::BookingResult;
use crate::models::user_model::{LoginRequest, LoginResponse, SignupRequest, UserResponse};
use crate::state::AppState;

pub async fn signup(
    Extension(state): Extension<AppState>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> BookingResult<(StatusCode, Json<UserResponse>)> {
    let user = state.accounts.signup(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

pub async fn login(
    Extension(state): Extension<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> BookingResult<Json<LoginResponse>> {
    let (token, user) = state.accounts.login(body(payload)?).await?;
    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}
