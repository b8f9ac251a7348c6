//! Reservation intake: slot validation first, then the atomic claim.
//!
//! Keeping the two steps apart means a bad date and an occupied slot reach the
//! farmer as different messages (400 vs 409).

use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::models::{slot_key_on, Booking};
use crate::services::store::{self, ReservationCandidate};

const MAX_CROP_NAME_LEN: usize = 120;
const MAX_NOTES_LEN: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub farmer_id: String,
    pub dealer_id: String,
    pub date: String,
    pub day_part: String,
    pub crop_name: Option<String>,
    pub notes: Option<String>,
}

pub fn check_and_reserve(conn: &Connection, request: &ReservationRequest) -> AppResult<Booking> {
    check_and_reserve_on(conn, request, Utc::now().date_naive())
}

pub fn check_and_reserve_on(
    conn: &Connection,
    request: &ReservationRequest,
    today: NaiveDate,
) -> AppResult<Booking> {
    let farmer_id = request.farmer_id.trim();
    if farmer_id.is_empty() {
        return Err(AppError::Validation("farmer_id is required".to_string()));
    }

    let crop_name = optional_text(request.crop_name.as_deref(), "crop_name", MAX_CROP_NAME_LEN)?;
    let notes = optional_text(request.notes.as_deref(), "notes", MAX_NOTES_LEN)?;

    let slot = slot_key_on(&request.dealer_id, &request.date, &request.day_part, today)?;

    store::reserve(
        conn,
        &ReservationCandidate {
            farmer_id,
            slot: &slot,
            crop_name,
            notes,
        },
    )
}

/// Trims free text, treating blank as absent.
fn optional_text<'a>(value: Option<&'a str>, field: &str, max: usize) -> AppResult<Option<&'a str>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(AppError::Validation(format!(
            "{field} must be at most {max} characters"
        ))),
        other => Ok(other),
    }
}
