//! Rating linkage: one rating per completed booking, by its farmer.

use rusqlite::Connection;
use serde::Deserialize;

use crate::db::queries::{self, NewRating};
use crate::errors::{AppError, AppResult};
use crate::models::{self, BookingStatus, Rating};

const MAX_REVIEW_LEN: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct RatingRequest {
    pub booking_id: String,
    pub score: i64,
    pub review: Option<String>,
    pub farmer_id: Option<String>,
}

pub fn can_rate(conn: &Connection, booking_id: &str, farmer_id: &str) -> AppResult<bool> {
    let Some(booking) = queries::get_booking_by_id(conn, booking_id)? else {
        return Ok(false);
    };
    if booking.farmer_id != farmer_id || booking.status != BookingStatus::Completed {
        return Ok(false);
    }
    Ok(queries::get_rating_for_booking(conn, booking_id)?.is_none())
}

/// Eligibility and uniqueness are checked by the insert itself, so two racing
/// submissions cannot both succeed.
pub fn record_rating(conn: &Connection, request: &RatingRequest) -> AppResult<Rating> {
    let score = u8::try_from(request.score)
        .ok()
        .filter(|s| (1..=5).contains(s))
        .ok_or_else(|| AppError::Validation("score must be between 1 and 5".to_string()))?;

    let review = request
        .review
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    if review.is_some_and(|r| r.chars().count() > MAX_REVIEW_LEN) {
        return Err(AppError::Validation(format!(
            "review must be at most {MAX_REVIEW_LEN} characters"
        )));
    }

    let farmer_id = request.farmer_id.as_deref().map(str::trim).filter(|f| !f.is_empty());
    let id = uuid::Uuid::new_v4().to_string();

    let inserted = queries::insert_rating_if_eligible(
        conn,
        &NewRating {
            id: &id,
            booking_id: &request.booking_id,
            farmer_id,
            score,
            review,
            created_at: models::now(),
        },
    )?;

    if let Some(rating) = inserted {
        tracing::info!(
            booking_id = %rating.booking_id,
            dealer_id = %rating.dealer_id,
            score = rating.score,
            "rating recorded"
        );
        return Ok(rating);
    }

    let booking = queries::get_booking_by_id(conn, &request.booking_id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {}", request.booking_id)))?;

    if farmer_id.is_some_and(|f| f != booking.farmer_id) {
        return Err(AppError::NotEligible(
            "only the farmer who made this booking can rate it".to_string(),
        ));
    }
    Err(AppError::NotEligible(format!(
        "booking is {}, only completed bookings can be rated",
        booking.status
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{slot_key_on, Role};
    use crate::services::store::{self, ReservationCandidate};
    use chrono::NaiveDate;

    fn booking_in(conn: &Connection, status: BookingStatus) -> String {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let slot = slot_key_on("dealer-d", "2025-03-10", "morning", today).unwrap();
        let booking = store::reserve(
            conn,
            &ReservationCandidate {
                farmer_id: "farmer-a",
                slot: &slot,
                crop_name: None,
                notes: None,
            },
        )
        .unwrap();

        let path: &[(BookingStatus, Role)] = match status {
            BookingStatus::Pending => &[],
            BookingStatus::Confirmed => &[(BookingStatus::Confirmed, Role::Dealer)],
            BookingStatus::Completed => &[
                (BookingStatus::Confirmed, Role::Dealer),
                (BookingStatus::Completed, Role::Dealer),
            ],
            BookingStatus::Cancelled => &[(BookingStatus::Cancelled, Role::Dealer)],
        };
        for (to, actor) in path {
            store::apply_transition(conn, &booking.id, *to, *actor).unwrap();
        }
        booking.id
    }

    fn request(booking_id: &str, score: i64) -> RatingRequest {
        RatingRequest {
            booking_id: booking_id.to_string(),
            score,
            review: Some("good deal".to_string()),
            farmer_id: Some("farmer-a".to_string()),
        }
    }

    #[test]
    fn test_exactly_one_rating_per_completed_booking() {
        let conn = db::init_db(":memory:").unwrap();
        let id = booking_in(&conn, BookingStatus::Completed);

        assert!(can_rate(&conn, &id, "farmer-a").unwrap());
        let rating = record_rating(&conn, &request(&id, 4)).unwrap();
        assert_eq!(rating.score, 4);
        assert_eq!(rating.dealer_id, "dealer-d");
        assert_eq!(rating.review.as_deref(), Some("good deal"));
        assert!(!can_rate(&conn, &id, "farmer-a").unwrap());

        for _ in 0..3 {
            let err = record_rating(&conn, &request(&id, 5)).unwrap_err();
            assert!(matches!(err, AppError::AlreadyRated));
        }
    }

    #[test]
    fn test_non_completed_bookings_not_eligible() {
        for status in [
            BookingStatus::Pending,
            BookingStatus::Confirmed,
            BookingStatus::Cancelled,
        ] {
            let conn = db::init_db(":memory:").unwrap();
            let id = booking_in(&conn, status);

            assert!(!can_rate(&conn, &id, "farmer-a").unwrap());
            let err = record_rating(&conn, &request(&id, 3)).unwrap_err();
            assert!(matches!(err, AppError::NotEligible(_)), "{status} should not be ratable");
        }
    }

    #[test]
    fn test_other_farmer_not_eligible() {
        let conn = db::init_db(":memory:").unwrap();
        let id = booking_in(&conn, BookingStatus::Completed);

        assert!(!can_rate(&conn, &id, "farmer-b").unwrap());
        let mut req = request(&id, 3);
        req.farmer_id = Some("farmer-b".to_string());
        assert!(matches!(
            record_rating(&conn, &req),
            Err(AppError::NotEligible(_))
        ));
    }

    #[test]
    fn test_unknown_booking_not_found() {
        let conn = db::init_db(":memory:").unwrap();
        assert!(!can_rate(&conn, "missing", "farmer-a").unwrap());
        assert!(matches!(
            record_rating(&conn, &request("missing", 3)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_score_out_of_range_rejected() {
        let conn = db::init_db(":memory:").unwrap();
        let id = booking_in(&conn, BookingStatus::Completed);

        for score in [0, 6, -1, 300] {
            assert!(matches!(
                record_rating(&conn, &request(&id, score)),
                Err(AppError::Validation(_))
            ));
        }
        assert!(can_rate(&conn, &id, "farmer-a").unwrap());
    }
}
