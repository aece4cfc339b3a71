//! End-to-end flows through the router, backed by the in-memory store.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use common::TestApp;

async fn seed_theatre(app: &TestApp, name: &str) -> String {
    let (status, json) = app
        .send(
            Method::POST,
            "/theatres",
            None,
            Some(json!({
                "name": name,
                "city": "Pune",
                "postalCode": "411001",
                "address": "12 MG Road"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["_id"].as_str().unwrap().to_string()
}

async fn seed_movie(app: &TestApp, title: &str) -> String {
    let (status, json) = app
        .send(
            Method::POST,
            "/movies",
            None,
            Some(json!({
                "title": title,
                "description": "A heist in a city that never sleeps",
                "cast": ["Ana Diaz"],
                "trailerUrl": "https://example.com/trailer",
                "releaseDate": "2024-04-12",
                "director": "J. Park"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json["_id"].as_str().unwrap().to_string()
}

async fn seed_show(app: &TestApp, theatre: &str, movie: &str, seats: u32) -> Value {
    let (status, json) = app
        .send(
            Method::POST,
            "/shows",
            None,
            Some(json!({
                "theatreId": theatre,
                "movieId": movie,
                "totalSeats": seats,
                "pricePerSeat": 12.5,
                "startTime": "2024-05-01T18:30:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    json
}

fn booking_body(theatre: &str, movie: &str, seats: i64) -> Value {
    json!({
        "theatreId": theatre,
        "movieId": movie,
        "timing": "2024-05-01T18:30:00Z",
        "seatCount": seats
    })
}

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new();
    let (status, json) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn book_cancel_round_trip_restores_seats() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let movie = seed_movie(&app, "Night Shift").await;
    let show = seed_show(&app, &theatre, &movie, 100).await;
    assert_eq!(show["availableSeats"], 100);
    let (user_id, token) = app.user("maya@example.com").await;

    let (status, json) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(booking_body(&theatre, &movie, 30)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["booking"]["status"], "IN_PROCESS");
    assert_eq!(json["booking"]["totalCost"], 375.0);
    assert_eq!(json["updatedUser"]["_id"], user_id.to_hex());
    let booking_id = json["booking"]["_id"].as_str().unwrap().to_string();
    assert_eq!(json["updatedUser"]["bookings"], json!([booking_id.clone()]));

    let (_, shows) = app
        .send(Method::GET, &format!("/shows?movieId={movie}"), None, None)
        .await;
    assert_eq!(shows["data"][0]["availableSeats"], 70);

    let (status, json) = app
        .send(
            Method::PATCH,
            &format!("/bookings/{booking_id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "CANCELED");

    let (_, shows) = app
        .send(Method::GET, &format!("/shows?theatreId={theatre}"), None, None)
        .await;
    assert_eq!(shows["data"][0]["availableSeats"], 100);

    let (status, json) = app
        .send(
            Method::PATCH,
            &format!("/bookings/{booking_id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn booking_errors_map_to_status_codes() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let movie = seed_movie(&app, "Night Shift").await;
    seed_show(&app, &theatre, &movie, 5).await;
    let (_, token) = app.user("maya@example.com").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/bookings",
            None,
            Some(booking_body(&theatre, &movie, 1)),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(booking_body(&theatre, &movie, 0)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");

    let (status, json) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(booking_body(&theatre, &movie, 6)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INSUFFICIENT_CAPACITY");

    let mut unknown_time = booking_body(&theatre, &movie, 1);
    unknown_time["timing"] = json!("2031-01-01T10:00:00Z");
    let (status, _) = app
        .send(Method::POST, "/bookings", Some(&token), Some(unknown_time))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(json!("not an object")),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn confirm_after_cancel_is_rejected_and_bookings_are_private() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let movie = seed_movie(&app, "Night Shift").await;
    seed_show(&app, &theatre, &movie, 10).await;
    let (_, token) = app.user("maya@example.com").await;
    let (_, other_token) = app.user("omar@example.com").await;

    let (_, json) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(booking_body(&theatre, &movie, 2)),
        )
        .await;
    let booking_id = json["booking"]["_id"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/bookings/{booking_id}"),
            Some(&other_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/bookings/{booking_id}/cancel"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = app
        .send(
            Method::PATCH,
            &format!("/bookings/{booking_id}/confirm"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "INVALID_TRANSITION");

    let (_, shows) = app.send(Method::GET, "/shows", None, None).await;
    assert_eq!(shows["data"][0]["availableSeats"], 10);
}

#[tokio::test]
async fn confirm_moves_to_successful() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let movie = seed_movie(&app, "Night Shift").await;
    seed_show(&app, &theatre, &movie, 10).await;
    let (_, token) = app.user("maya@example.com").await;

    let (_, json) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(booking_body(&theatre, &movie, 2)),
        )
        .await;
    let booking_id = json["booking"]["_id"].as_str().unwrap().to_string();

    let (status, json) = app
        .send(
            Method::PATCH,
            &format!("/bookings/{booking_id}/confirm"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "SUCCESSFUL");
}

#[tokio::test]
async fn show_creation_validates_references() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;

    let (status, json) = app
        .send(
            Method::POST,
            "/shows",
            None,
            Some(json!({ "theatreId": theatre, "totalSeats": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");

    let (status, json) = app
        .send(
            Method::POST,
            "/shows",
            None,
            Some(json!({
                "theatreId": theatre,
                "movieId": "664f1c2a9b1e8a3d2c4b5a69",
                "totalSeats": 10,
                "pricePerSeat": 5.0,
                "startTime": "2024-05-01T18:30:00Z"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");

    let (status, _) = app.send(Method::GET, "/shows", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn theatre_movie_membership() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let first = seed_movie(&app, "Night Shift").await;
    let second = seed_movie(&app, "Second Act").await;
    let uri = format!("/theatres/{theatre}/movies");

    let (status, json) = app
        .send(
            Method::PATCH,
            &uri,
            None,
            Some(json!({ "movies": [first], "insert": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    let (_, json) = app
        .send(
            Method::PATCH,
            &uri,
            None,
            Some(json!({ "movies": [first, second], "insert": true })),
        )
        .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (_, json) = app
        .send(Method::GET, &format!("{uri}?movie={second}"), None, None)
        .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["title"], "Second Act");

    let (status, json) = app
        .send(
            Method::PATCH,
            &uri,
            None,
            Some(json!({ "movies": ["664f1c2a9b1e8a3d2c4b5a69"], "insert": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .send(Method::PATCH, &uri, None, Some(json!({ "movies": [first] })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::GET,
            "/theatres/664f1c2a9b1e8a3d2c4b5a69/movies",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn deleted_theatre_hides_its_shows() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let movie = seed_movie(&app, "Night Shift").await;
    seed_show(&app, &theatre, &movie, 10).await;
    let (_, token) = app.user("maya@example.com").await;

    let (status, _) = app
        .send(Method::DELETE, &format!("/theatres/{theatre}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send(Method::GET, "/shows", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .send(
            Method::POST,
            "/bookings",
            Some(&token),
            Some(booking_body(&theatre, &movie, 1)),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_names_conflict() {
    let app = TestApp::new();
    seed_theatre(&app, "Grand Plaza").await;
    let (status, json) = app
        .send(
            Method::POST,
            "/theatres",
            None,
            Some(json!({
                "name": "Grand Plaza",
                "city": "Mumbai",
                "postalCode": "400001",
                "address": "1 Marine Drive"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "DUPLICATE");
}

#[tokio::test]
async fn theatre_details_can_be_patched() {
    let app = TestApp::new();
    let theatre = seed_theatre(&app, "Grand Plaza").await;
    let movie = seed_movie(&app, "Night Shift").await;
    app.send(
        Method::PATCH,
        &format!("/theatres/{theatre}/movies"),
        None,
        Some(json!({ "movies": [movie], "insert": true })),
    )
    .await;
    let uri = format!("/theatres/{theatre}");

    let (status, json) = app
        .send(
            Method::PATCH,
            &uri,
            None,
            Some(json!({ "address": "40 FC Road", "movies": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["address"], "40 FC Road");
    assert_eq!(json["name"], "Grand Plaza");
    assert_eq!(json["movies"], json!([movie]));

    let (status, json) = app.send(Method::PATCH, &uri, None, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_REQUEST");

    let (status, _) = app
        .send(
            Method::PATCH,
            "/theatres/664f1c2a9b1e8a3d2c4b5a69",
            None,
            Some(json!({ "city": "Nashik" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn movies_can_be_searched_by_name() {
    let app = TestApp::new();
    seed_movie(&app, "Night Shift").await;
    seed_movie(&app, "Morning Glory").await;

    let (status, json) = app.send(Method::GET, "/movies?name=night", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["title"], "Night Shift");

    let (status, json) = app.send(Method::GET, "/movies", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().map(Vec::len), Some(2));

    let (status, json) = app.send(Method::GET, "/movies?name=noon", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

#[tokio::test]
async fn signup_and_login() {
    let app = TestApp::new();
    let (status, json) = app
        .send(
            Method::POST,
            "/users/signup",
            None,
            Some(json!({
                "username": "ravi",
                "email": "ravi@example.com",
                "password": "long-enough-password"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{json}");
    assert!(json.get("password_hash").is_none());

    let (status, json) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": "ravi@example.com", "password": "long-enough-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = json["token"].as_str().unwrap().to_string();
    assert_eq!(json["user"]["email"], "ravi@example.com");

    let (status, _) = app
        .send(
            Method::GET,
            "/bookings/664f1c2a9b1e8a3d2c4b5a69",
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, json) = app
        .send(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": "ravi@example.com", "password": "wrong-password!" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"], "Invalid credentials");
}
