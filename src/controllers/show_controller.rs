use axum::{
    extract::{rejection::JsonRejection, Extension, Query},
    http::StatusCode,
    response::Json,
};
use serde_json::json;

use super::{body, Data};
use crate::error::BookingResult;
use crate::models::show_model::{NewShow, ShowQuery, ShowResponse};
use crate::state::AppState;

pub async fn add_show(
    Extension(state): Extension<AppState>,
    payload: Result<Json<NewShow>, JsonRejection>,
) -> BookingResult<(StatusCode, Json<ShowResponse>)> {
    let input = body(payload)?;
    let show = ShowResponse::from(state.shows.create_show(&input).await?);
    state
        .feed
        .broadcast("show_created", "success", json!(show))
        .await;
    Ok((StatusCode::CREATED, Json(show)))
}

pub async fn load_shows(
    Extension(state): Extension<AppState>,
    Query(query): Query<ShowQuery>,
) -> BookingResult<Json<Data<Vec<ShowResponse>>>> {
    let filter = query.to_filter()?;
    let shows = state.shows.get_shows(&filter).await?;
    Ok(Json(Data {
        data: shows.into_iter().map(ShowResponse::from).collect(),
    }))
}
