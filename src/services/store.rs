//! Booking store: the only code that writes booking rows or their status.

use rusqlite::Connection;

use crate::db::queries::{self, NewBooking};
use crate::errors::{AppError, AppResult};
use crate::models::{self, Booking, BookingStatus, Role, SlotKey};
use crate::services::state_machine;

pub struct ReservationCandidate<'a> {
    pub farmer_id: &'a str,
    pub slot: &'a SlotKey,
    pub crop_name: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Atomically claims the slot and records a pending booking.
pub fn reserve(conn: &Connection, candidate: &ReservationCandidate<'_>) -> AppResult<Booking> {
    let id = uuid::Uuid::new_v4().to_string();
    let booking = queries::insert_pending_booking(
        conn,
        &NewBooking {
            id: &id,
            farmer_id: candidate.farmer_id,
            slot: candidate.slot,
            crop_name: candidate.crop_name,
            notes: candidate.notes,
            created_at: models::now(),
        },
    )?;

    tracing::info!(
        booking_id = %booking.id,
        dealer_id = %booking.dealer_id,
        date = %booking.date,
        day_part = booking.day_part.as_str(),
        "booking reserved"
    );
    Ok(booking)
}

pub fn get(conn: &Connection, id: &str) -> AppResult<Booking> {
    queries::get_booking_by_id(conn, id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))
}

pub fn list_by_farmer(conn: &Connection, farmer_id: &str) -> AppResult<Vec<Booking>> {
    queries::get_bookings_for_farmer(conn, farmer_id)
}

pub fn list_by_dealer(conn: &Connection, dealer_id: &str) -> AppResult<Vec<Booking>> {
    queries::get_bookings_for_dealer(conn, dealer_id)
}

/// Validates the transition against the current record, then swaps the
/// status only if nobody changed it in between. Losing that race is reported
/// as an illegal transition from the status that won.
pub fn apply_transition(
    conn: &Connection,
    id: &str,
    new_status: BookingStatus,
    actor: Role,
) -> AppResult<Booking> {
    let current = get(conn, id)?;
    state_machine::decide(current.status, new_status, actor)?;

    let now = models::now();
    if queries::update_booking_status_if(conn, id, current.status, new_status, now)? {
        tracing::info!(
            booking_id = %id,
            from = %current.status,
            to = %new_status,
            actor = %actor,
            "booking status changed"
        );
        return Ok(Booking {
            status: new_status,
            updated_at: now,
            ..current
        });
    }

    let fresh = get(conn, id)?;
    tracing::debug!(booking_id = %id, status = %fresh.status, "lost status race");
    Err(AppError::IllegalTransition {
        from: fresh.status,
        to: new_status,
        actor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{slot_key_on, DayPart};
    use chrono::NaiveDate;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn slot(dealer: &str, date: &str, part: &str) -> SlotKey {
        let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        slot_key_on(dealer, date, part, today).unwrap()
    }

    fn reserve_for(conn: &Connection, farmer: &str, slot: &SlotKey) -> AppResult<Booking> {
        reserve(
            conn,
            &ReservationCandidate {
                farmer_id: farmer,
                slot,
                crop_name: Some("maize"),
                notes: None,
            },
        )
    }

    #[test]
    fn test_reserve_creates_pending_booking() {
        let conn = setup_db();
        let key = slot("dealer-d", "2025-03-10", "morning");
        let booking = reserve_for(&conn, "farmer-a", &key).unwrap();

        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(booking.day_part, DayPart::Morning);
        assert_eq!(booking.slot_key(), key);
        assert_eq!(booking.created_at, booking.updated_at);
        assert_eq!(get(&conn, &booking.id).unwrap(), booking);
    }

    #[test]
    fn test_second_reservation_conflicts() {
        let conn = setup_db();
        let key = slot("dealer-d", "2025-03-10", "morning");
        reserve_for(&conn, "farmer-a", &key).unwrap();

        let err = reserve_for(&conn, "farmer-b", &key).unwrap_err();
        assert!(matches!(err, AppError::Conflict));
    }

    #[test]
    fn test_other_dealer_or_day_part_is_free() {
        let conn = setup_db();
        reserve_for(&conn, "farmer-a", &slot("dealer-d", "2025-03-10", "morning")).unwrap();

        assert!(reserve_for(&conn, "farmer-b", &slot("dealer-e", "2025-03-10", "morning")).is_ok());
        assert!(reserve_for(&conn, "farmer-b", &slot("dealer-d", "2025-03-10", "evening")).is_ok());
        assert!(reserve_for(&conn, "farmer-b", &slot("dealer-d", "2025-03-11", "morning")).is_ok());
    }

    #[test]
    fn test_farmer_may_hold_same_slot_with_two_dealers() {
        let conn = setup_db();
        reserve_for(&conn, "farmer-a", &slot("dealer-d", "2025-03-10", "morning")).unwrap();
        assert!(reserve_for(&conn, "farmer-a", &slot("dealer-e", "2025-03-10", "morning")).is_ok());
    }

    #[test]
    fn test_confirmed_booking_still_occupies_slot() {
        let conn = setup_db();
        let key = slot("dealer-d", "2025-03-10", "morning");
        let booking = reserve_for(&conn, "farmer-a", &key).unwrap();
        apply_transition(&conn, &booking.id, BookingStatus::Confirmed, Role::Dealer).unwrap();

        assert!(matches!(
            reserve_for(&conn, "farmer-b", &key),
            Err(AppError::Conflict)
        ));
    }

    #[test]
    fn test_slot_reuse_after_cancel_and_complete() {
        let conn = setup_db();
        let key = slot("dealer-d", "2025-03-10", "morning");

        let first = reserve_for(&conn, "farmer-a", &key).unwrap();
        apply_transition(&conn, &first.id, BookingStatus::Cancelled, Role::Farmer).unwrap();

        let second = reserve_for(&conn, "farmer-b", &key).unwrap();
        apply_transition(&conn, &second.id, BookingStatus::Confirmed, Role::Dealer).unwrap();
        apply_transition(&conn, &second.id, BookingStatus::Completed, Role::Dealer).unwrap();

        let third = reserve_for(&conn, "farmer-c", &key).unwrap();
        assert_eq!(third.status, BookingStatus::Pending);

        // History is kept
        assert_eq!(list_by_dealer(&conn, "dealer-d").unwrap().len(), 3);
    }

    #[test]
    fn test_illegal_transitions_leave_status_unchanged() {
        let roles = [Role::Farmer, Role::Dealer, Role::Admin];

        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                for actor in roles {
                    if state_machine::is_allowed(from, to, actor) {
                        continue;
                    }
                    let conn = setup_db();
                    let booking =
                        reserve_for(&conn, "farmer-a", &slot("dealer-d", "2025-03-10", "morning"))
                            .unwrap();
                    drive_to(&conn, &booking.id, from);

                    let err = apply_transition(&conn, &booking.id, to, actor).unwrap_err();
                    assert!(
                        matches!(err, AppError::IllegalTransition { .. }),
                        "{from} -> {to} by {actor} should be illegal"
                    );
                    assert_eq!(get(&conn, &booking.id).unwrap().status, from);
                }
            }
        }
    }

    fn drive_to(conn: &Connection, id: &str, status: BookingStatus) {
        let path: &[(BookingStatus, Role)] = match status {
            BookingStatus::Pending => &[],
            BookingStatus::Confirmed => &[(BookingStatus::Confirmed, Role::Dealer)],
            BookingStatus::Completed => &[
                (BookingStatus::Confirmed, Role::Dealer),
                (BookingStatus::Completed, Role::Dealer),
            ],
            BookingStatus::Cancelled => &[(BookingStatus::Cancelled, Role::Farmer)],
        };
        for (to, actor) in path {
            apply_transition(conn, id, *to, *actor).unwrap();
        }
    }

    #[test]
    fn test_transition_on_unknown_booking_is_not_found() {
        let conn = setup_db();
        let err = apply_transition(&conn, "missing", BookingStatus::Confirmed, Role::Dealer)
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_lists_are_newest_first() {
        let conn = setup_db();
        let a = reserve_for(&conn, "farmer-a", &slot("dealer-d", "2025-03-10", "morning")).unwrap();
        let b = reserve_for(&conn, "farmer-a", &slot("dealer-d", "2025-03-10", "afternoon")).unwrap();
        let c = reserve_for(&conn, "farmer-a", &slot("dealer-e", "2025-03-12", "evening")).unwrap();

        let ids: Vec<_> = list_by_farmer(&conn, "farmer-a")
            .unwrap()
            .into_iter()
            .map(|bk| bk.id)
            .collect();
        assert_eq!(ids, vec![c.id.clone(), b.id.clone(), a.id.clone()]);

        let ids: Vec<_> = list_by_dealer(&conn, "dealer-d")
            .unwrap()
            .into_iter()
            .map(|bk| bk.id)
            .collect();
        assert_eq!(ids, vec![b.id, a.id]);
        assert!(list_by_farmer(&conn, "nobody").unwrap().is_empty());
    }
}
