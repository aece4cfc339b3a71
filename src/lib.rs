use axum::{
    http::{header, Method},
    routing::{get, patch, post},
    Extension, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod auth;
pub mod background;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
pub mod websockets;

use controllers::{
    booking_controller::*, health_controller, movie_controller::*, show_controller::*,
    theatre_controller::*, user_controller,
};
use state::AppState;
use websockets::websocket_handler;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_origin(state.config.cors_origin.clone())
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health_controller::health))
        .route("/ws", get(websocket_handler))
        .route("/shows", get(load_shows).post(add_show))
        .route("/bookings", post(add_booking))
        .route("/bookings/:id", get(load_booking))
        .route("/bookings/:id/cancel", patch(cancel_booking))
        .route("/bookings/:id/confirm", patch(confirm_booking))
        .route("/theatres", get(load_theatres).post(add_theatre))
        .route(
            "/theatres/:id",
            get(load_theatre)
                .patch(update_theatre)
                .delete(delete_theatre),
        )
        .route(
            "/theatres/:id/movies",
            get(load_theatre_movies).patch(update_theatre_movies),
        )
        .route("/movies", get(load_movies).post(add_movie))
        .route(
            "/movies/:id",
            get(load_movie).patch(update_movie).delete(delete_movie),
        )
        .route("/users/signup", post(user_controller::signup))
        .route("/users/login", post(user_controller::login))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
