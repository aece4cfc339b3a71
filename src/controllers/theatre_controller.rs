use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::{body, Data};
use crate::error::{BookingError, BookingResult};
use crate::models::movie_model::MovieResponse;
use crate::models::theatre_model::{
    NewTheatre, TheatreMoviesUpdate, TheatreResponse, TheatreUpdate,
};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Deserialize, Default)]
pub struct TheatreQuery {
    pub city: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TheatreMoviesQuery {
    pub movie: Option<String>,
}

pub async fn load_theatres(
    Extension(state): Extension<AppState>,
    Query(query): Query<TheatreQuery>,
) -> BookingResult<Json<Vec<TheatreResponse>>> {
    let theatres = state.theatres.list(query.city.as_deref()).await?;
    Ok(Json(theatres.into_iter().map(Into::into).collect()))
}

pub async fn load_theatre(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
) -> BookingResult<Json<TheatreResponse>> {
    let theatre_id = parse_object_id(&id_str, "id")?;
    Ok(Json(state.theatres.get(theatre_id).await?.into()))
}

pub async fn add_theatre(
    Extension(state): Extension<AppState>,
    payload: Result<Json<NewTheatre>, JsonRejection>,
) -> BookingResult<(StatusCode, Json<TheatreResponse>)> {
    let theatre = state.theatres.create(body(payload)?).await?;
    Ok((StatusCode::CREATED, Json(theatre.into())))
}

pub async fn update_theatre(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    payload: Result<Json<TheatreUpdate>, JsonRejection>,
) -> BookingResult<Json<TheatreResponse>> {
    let theatre_id = parse_object_id(&id_str, "id")?;
    let theatre = state.theatres.update(theatre_id, body(payload)?).await?;
    Ok(Json(theatre.into()))
}

pub async fn delete_theatre(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
) -> BookingResult<Json<String>> {
    let theatre_id = parse_object_id(&id_str, "id")?;
    state.theatres.delete(theatre_id).await?;
    Ok(Json("Theatre deleted successfully".to_string()))
}

pub async fn update_theatre_movies(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    payload: Result<Json<TheatreMoviesUpdate>, JsonRejection>,
) -> BookingResult<Json<Data<Vec<MovieResponse>>>> {
    let theatre_id = parse_object_id(&id_str, "id")?;
    let update = body(payload)?;
    let insert = update
        .insert
        .ok_or_else(|| BookingError::InvalidRequest("insert is missing".into()))?;
    let movie_ids = update
        .movies
        .iter()
        .map(|raw| parse_object_id(raw, "movies"))
        .collect::<BookingResult<Vec<_>>>()?;

    let movies = if insert {
        state.associations.add_movies(theatre_id, &movie_ids).await?
    } else {
        state.associations.remove_movies(theatre_id, &movie_ids).await?
    };
    Ok(Json(Data {
        data: movies.into_iter().map(Into::into).collect(),
    }))
}

pub async fn load_theatre_movies(
    Path(id_str): Path<String>,
    Extension(state): Extension<AppState>,
    Query(query): Query<TheatreMoviesQuery>,
) -> BookingResult<Json<Data<Vec<MovieResponse>>>> {
    let theatre_id = parse_object_id(&id_str, "id")?;
    let movie_id = match query.movie.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_object_id(raw, "movie")?),
    };
    let movies = state.associations.movies_at(theatre_id, movie_id).await?;
    Ok(Json(Data {
        data: movies.into_iter().map(Into::into).collect(),
    }))
}
