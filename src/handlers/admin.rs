use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus};
use crate::state::AppState;

use super::check_auth;

// GET /api/admin/status
#[derive(Serialize)]
pub struct StatusResponse {
    bookings: BTreeMap<&'static str, i64>,
    active_bookings: i64,
    ratings: i64,
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<StatusResponse>> {
    check_auth(&headers, &state.config.admin_token)?;

    let (counts, ratings) = {
        let db = state.db.lock()?;
        (
            queries::count_bookings_by_status(&db)?,
            queries::count_ratings(&db)?,
        )
    };

    let active_bookings = counts
        .iter()
        .filter(|(status, _)| status.is_active())
        .map(|(_, n)| n)
        .sum::<i64>();

    Ok(Json(StatusResponse {
        bookings: counts
            .into_iter()
            .map(|(status, n)| (status.as_str(), n))
            .collect(),
        active_bookings,
        ratings,
    }))
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub status: Option<String>,
    pub dealer_id: Option<String>,
    pub limit: Option<i64>,
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let status_filter = query
        .status
        .as_deref()
        .map(|s| {
            BookingStatus::parse(s)
                .ok_or_else(|| AppError::Validation(format!("unknown status '{s}'")))
        })
        .transpose()?;

    let bookings = {
        let db = state.db.lock()?;
        queries::get_all_bookings(&db, status_filter, query.dealer_id.as_deref(), limit)?
    };

    Ok(Json(bookings))
}
