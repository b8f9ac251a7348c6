use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::errors::{AppError, AppResult};
use crate::models::{
    Booking, BookingStatus, DayPart, DealerRating, Notification, NotificationEvent,
    NotificationKind, Rating, Role, SlotKey, UserProfile, TIMESTAMP_FORMAT,
};

const DATE_FORMAT: &str = "%Y-%m-%d";

const BOOKING_COLUMNS: &str =
    "id, farmer_id, dealer_id, slot_date, day_part, crop_name, notes, status, created_at, updated_at";

// ── Bookings ──

pub struct NewBooking<'a> {
    pub id: &'a str,
    pub farmer_id: &'a str,
    pub slot: &'a SlotKey,
    pub crop_name: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

/// Inserts a pending booking. The partial unique index on active slots makes
/// this a single check-and-insert; a collision comes back as `Conflict`.
pub fn insert_pending_booking(conn: &Connection, new: &NewBooking<'_>) -> AppResult<Booking> {
    let date = new.slot.date.format(DATE_FORMAT).to_string();
    let created_at = new.created_at.format(TIMESTAMP_FORMAT).to_string();

    let result = conn.execute(
        "INSERT INTO bookings (id, farmer_id, dealer_id, slot_date, day_part, crop_name, notes, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8, ?8)",
        params![
            new.id,
            new.farmer_id,
            new.slot.dealer_id,
            date,
            new.slot.day_part.as_str(),
            new.crop_name,
            new.notes,
            created_at,
        ],
    );

    match result {
        Ok(_) => Ok(Booking {
            id: new.id.to_string(),
            farmer_id: new.farmer_id.to_string(),
            dealer_id: new.slot.dealer_id.clone(),
            date: new.slot.date,
            day_part: new.slot.day_part,
            crop_name: new.crop_name.map(str::to_string),
            notes: new.notes.map(str::to_string),
            status: BookingStatus::Pending,
            created_at: new.created_at,
            updated_at: new.created_at,
        }),
        Err(e) if is_unique_violation(&e) => Err(AppError::Conflict),
        Err(e) => Err(e.into()),
    }
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> AppResult<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;
    Ok(booking)
}

pub fn get_bookings_for_farmer(conn: &Connection, farmer_id: &str) -> AppResult<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE farmer_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![farmer_id], parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn get_bookings_for_dealer(conn: &Connection, dealer_id: &str) -> AppResult<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE dealer_id = ?1
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![dealer_id], parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn get_all_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    dealer_filter: Option<&str>,
    limit: i64,
) -> AppResult<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings
         WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR dealer_id = ?2)
         ORDER BY created_at DESC, rowid DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![status_filter.map(|s| s.as_str()), dealer_filter, limit],
        parse_booking_row,
    )?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

/// Compare-and-swap on the status column. Returns false when the row no
/// longer holds `expected`, i.e. another transition got there first.
pub fn update_booking_status_if(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    new_status: BookingStatus,
    updated_at: NaiveDateTime,
) -> AppResult<bool> {
    let updated_at = updated_at.format(TIMESTAMP_FORMAT).to_string();
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![new_status.as_str(), updated_at, id, expected.as_str()],
    )?;
    Ok(count > 0)
}

pub fn count_bookings_by_status(conn: &Connection) -> AppResult<Vec<(BookingStatus, i64)>> {
    let mut counts = Vec::with_capacity(BookingStatus::ALL.len());
    for status in BookingStatus::ALL {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookings WHERE status = ?1",
            params![status.as_str()],
            |row| row.get(0),
        )?;
        counts.push((status, count));
    }
    Ok(counts)
}

fn parse_booking_row(row: &Row) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: row.get(0)?,
        farmer_id: row.get(1)?,
        dealer_id: row.get(2)?,
        date: parse_column(row, 3, |s| NaiveDate::parse_from_str(s, DATE_FORMAT).ok())?,
        day_part: parse_column(row, 4, DayPart::parse)?,
        crop_name: row.get(5)?,
        notes: row.get(6)?,
        status: parse_column(row, 7, BookingStatus::parse)?,
        created_at: parse_column(row, 8, parse_timestamp)?,
        updated_at: parse_column(row, 9, parse_timestamp)?,
    })
}

// ── Ratings ──

pub struct NewRating<'a> {
    pub id: &'a str,
    pub booking_id: &'a str,
    pub farmer_id: Option<&'a str>,
    pub score: u8,
    pub review: Option<&'a str>,
    pub created_at: NaiveDateTime,
}

/// Inserts a rating only if the booking is completed (and belongs to the
/// farmer, when one is given). The unique index on `booking_id` turns a second
/// attempt into `AlreadyRated`. Returns `None` when the booking did not qualify.
pub fn insert_rating_if_eligible(
    conn: &Connection,
    new: &NewRating<'_>,
) -> AppResult<Option<Rating>> {
    let created_at = new.created_at.format(TIMESTAMP_FORMAT).to_string();

    let result = conn.execute(
        "INSERT INTO ratings (id, booking_id, farmer_id, dealer_id, score, review, created_at)
         SELECT ?1, b.id, b.farmer_id, b.dealer_id, ?2, ?3, ?4
         FROM bookings b
         WHERE b.id = ?5 AND b.status = 'completed' AND (?6 IS NULL OR b.farmer_id = ?6)",
        params![
            new.id,
            new.score,
            new.review,
            created_at,
            new.booking_id,
            new.farmer_id,
        ],
    );

    match result {
        Ok(0) => Ok(None),
        Ok(_) => get_rating_for_booking(conn, new.booking_id),
        Err(e) if is_unique_violation(&e) => Err(AppError::AlreadyRated),
        Err(e) => Err(e.into()),
    }
}

pub fn get_rating_for_booking(conn: &Connection, booking_id: &str) -> AppResult<Option<Rating>> {
    let rating = conn
        .query_row(
            "SELECT id, booking_id, farmer_id, dealer_id, score, review, created_at
             FROM ratings WHERE booking_id = ?1",
            params![booking_id],
            |row| {
                Ok(Rating {
                    id: row.get(0)?,
                    booking_id: row.get(1)?,
                    farmer_id: row.get(2)?,
                    dealer_id: row.get(3)?,
                    score: row.get(4)?,
                    review: row.get(5)?,
                    created_at: parse_column(row, 6, parse_timestamp)?,
                })
            },
        )
        .optional()?;
    Ok(rating)
}

pub fn count_ratings(conn: &Connection) -> AppResult<i64> {
    let count = conn.query_row("SELECT COUNT(*) FROM ratings", [], |row| row.get(0))?;
    Ok(count)
}

pub fn add_dealer_score(conn: &Connection, dealer_id: &str, score: u8) -> AppResult<()> {
    conn.execute(
        "INSERT INTO dealer_ratings (dealer_id, rating_count, rating_sum) VALUES (?1, 1, ?2)
         ON CONFLICT(dealer_id) DO UPDATE SET
           rating_count = rating_count + 1,
           rating_sum = rating_sum + excluded.rating_sum,
           updated_at = datetime('now')",
        params![dealer_id, score],
    )?;
    Ok(())
}

pub fn get_dealer_rating(conn: &Connection, dealer_id: &str) -> AppResult<Option<DealerRating>> {
    let rating = conn
        .query_row(
            "SELECT dealer_id, rating_count, rating_sum FROM dealer_ratings WHERE dealer_id = ?1",
            params![dealer_id],
            |row| {
                let count: i64 = row.get(1)?;
                let sum: i64 = row.get(2)?;
                Ok(DealerRating {
                    dealer_id: row.get(0)?,
                    average: if count > 0 { sum as f64 / count as f64 } else { 0.0 },
                    count,
                })
            },
        )
        .optional()?;
    Ok(rating)
}

// ── Notifications ──

pub fn insert_notification(
    conn: &Connection,
    event: &NotificationEvent,
    created_at: NaiveDateTime,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO notifications (recipient_id, kind, title, message, booking_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            event.recipient_id,
            event.kind.as_str(),
            event.title,
            event.message,
            event.booking_id,
            created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_notifications_for(
    conn: &Connection,
    recipient_id: &str,
    limit: i64,
) -> AppResult<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, recipient_id, kind, title, message, booking_id, created_at
         FROM notifications WHERE recipient_id = ?1
         ORDER BY id DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![recipient_id, limit], parse_notification_row)?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn get_notifications_since(
    conn: &Connection,
    recipient_id: &str,
    since_id: i64,
) -> AppResult<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, recipient_id, kind, title, message, booking_id, created_at
         FROM notifications WHERE recipient_id = ?1 AND id > ?2
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![recipient_id, since_id], parse_notification_row)?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

fn parse_notification_row(row: &Row) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        recipient_id: row.get(1)?,
        kind: parse_column(row, 2, NotificationKind::parse)?,
        title: row.get(3)?,
        message: row.get(4)?,
        booking_id: row.get(5)?,
        created_at: parse_column(row, 6, parse_timestamp)?,
    })
}

// ── Users ──

pub fn get_user(conn: &Connection, id: &str) -> AppResult<Option<UserProfile>> {
    let user = conn
        .query_row(
            "SELECT id, role, display_name, contact_info FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(UserProfile {
                    id: row.get(0)?,
                    role: parse_column(row, 1, Role::parse)?,
                    display_name: row.get(2)?,
                    contact_info: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn save_user(conn: &Connection, user: &UserProfile) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, role, display_name, contact_info) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(id) DO UPDATE SET
           role = excluded.role,
           display_name = excluded.display_name,
           contact_info = excluded.contact_info,
           updated_at = datetime('now')",
        params![user.id, user.role.as_str(), user.display_name, user.contact_info],
    )?;
    Ok(())
}

// ── Helpers ──

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).ok()
}

fn parse_column<T>(
    row: &Row,
    idx: usize,
    parse: impl Fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unexpected value '{raw}'").into(),
        )
    })
}
