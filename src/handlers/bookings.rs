use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, Role};
use crate::services::bookings;
use crate::services::conflict::ReservationRequest;
use crate::services::Committed;
use crate::state::AppState;

use super::AppJson;

// POST /api/reservations
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<ReservationRequest>,
) -> AppResult<(StatusCode, Json<Committed<Booking>>)> {
    let committed = bookings::request_reservation(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(committed)))
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Booking>> {
    Ok(Json(bookings::get_booking(&state, &id)?))
}

// GET /api/bookings?farmer_id= | ?dealer_id=
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub farmer_id: Option<String>,
    pub dealer_id: Option<String>,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookingsQuery>,
) -> AppResult<Json<Vec<Booking>>> {
    let list = match (query.farmer_id.as_deref(), query.dealer_id.as_deref()) {
        (Some(farmer_id), None) => bookings::bookings_for_farmer(&state, farmer_id)?,
        (None, Some(dealer_id)) => bookings::bookings_for_dealer(&state, dealer_id)?,
        _ => {
            return Err(AppError::Validation(
                "pass exactly one of farmer_id or dealer_id".to_string(),
            ))
        }
    };
    Ok(Json(list))
}

// PATCH /api/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusChangeRequest {
    pub new_status: String,
    pub actor_role: String,
    pub actor_id: Option<String>,
}

pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(body): AppJson<StatusChangeRequest>,
) -> AppResult<Json<Committed<Booking>>> {
    let new_status = BookingStatus::parse(&body.new_status).ok_or_else(|| {
        AppError::Validation(format!("unknown status '{}'", body.new_status))
    })?;
    let actor = Role::parse(&body.actor_role)
        .ok_or_else(|| AppError::Validation(format!("unknown role '{}'", body.actor_role)))?;

    let committed =
        bookings::change_status(&state, &id, new_status, actor, body.actor_id.as_deref()).await?;
    Ok(Json(committed))
}

// GET /api/bookings/:id/can-rate?farmer_id=
#[derive(Deserialize)]
pub struct CanRateQuery {
    pub farmer_id: String,
}

#[derive(Serialize)]
pub struct CanRateResponse {
    can_rate: bool,
}

pub async fn can_rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<CanRateQuery>,
) -> AppResult<Json<CanRateResponse>> {
    let can_rate = bookings::can_rate(&state, &id, &query.farmer_id)?;
    Ok(Json(CanRateResponse { can_rate }))
}
