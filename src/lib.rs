pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

pub use config::AppConfig;
pub use errors::{AppError, AppResult};
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/reservations",
            post(handlers::bookings::create_reservation),
        )
        .route("/api/bookings", get(handlers::bookings::list_bookings))
        .route("/api/bookings/:id", get(handlers::bookings::get_booking))
        .route(
            "/api/bookings/:id/status",
            patch(handlers::bookings::update_status),
        )
        .route(
            "/api/bookings/:id/can-rate",
            get(handlers::bookings::can_rate),
        )
        .route("/api/ratings", post(handlers::ratings::create_rating))
        .route(
            "/api/dealers/:id/rating",
            get(handlers::ratings::dealer_rating),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/notifications/events",
            get(handlers::notifications::events_stream),
        )
        .route("/api/admin/status", get(handlers::admin::get_status))
        .route("/api/admin/bookings", get(handlers::admin::get_bookings))
        .route(
            "/calendar/:booking_id",
            get(handlers::calendar::download_ics),
        )
        .with_state(state)
}
