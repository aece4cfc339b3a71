use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::Json,
};

use serde::Deserialize;

use super::body;
use crate::error::BookingResult;
use crate::models::movie_model::{MovieResponse, MovieUpdate, NewMovie};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Default)]
pub struct MovieQuery {
    pub name: Option<String>,
}

pub async fn load_movies(
    Extension(state): Extension<AppState>,
    Query(query): Query<MovieQuery>,
) -> BookingResult<Json<Vec<MovieResponse>>> {
    let movies = state.movies.list(query.name.as_deref()).await?;
    Ok(Json(movies.into_iter().map(Into::into).collect()))
}

pub async fn load_movie(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
) -> BookingResult<Json<MovieResponse>> {
    let movie_id = parse_object_id(&id_str, "id")?;
    Ok(Json(state.movies.get(movie_id).await?.into()))
}

pub async fn add_movie(
    Extension(state): Extension<AppState>,
    payload: Result<Json<NewMovie>, JsonRejection>,
) -> BookingResult<(StatusCode, Json<MovieResponse>)> {
    let movie = state.movies.create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(movie.into())))
}

pub async fn update_movie(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    payload: Result<Json<MovieUpdate>, JsonRejection>,
) -> BookingResult<Json<MovieResponse>> {
    let movie_id = parse_object_id(&id_str, "id")?;
    let movie = state.movies.update(movie_id, body(payload)?).await?;
    Ok(Json(movie.into()))
}

pub async fn delete_movie(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
) -> BookingResult<Json<String>> {
    let movie_id = parse_object_id(&id_str, "id")?;
    state.movies.delete(movie_id).await?;
    Ok(Json("Movie deleted successfully".to_string()))
}
