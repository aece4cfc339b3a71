pub mod booking_model;
pub mod movie_model;
pub mod payment_model;
pub mod show_model;
pub mod theatre_model;
pub mod user_model;
