//! Legal booking status transitions and who may trigger them.
//!
//! Pure decision logic: the store applies whatever this module allows.

use crate::errors::{AppError, AppResult};
use crate::models::{BookingStatus, Role};

/// Checks a requested transition against the lifecycle table.
pub fn decide(from: BookingStatus, to: BookingStatus, actor: Role) -> AppResult<()> {
    if is_allowed(from, to, actor) {
        Ok(())
    } else {
        Err(AppError::IllegalTransition { from, to, actor })
    }
}

pub fn is_allowed(from: BookingStatus, to: BookingStatus, actor: Role) -> bool {
    use crate::models::BookingStatus::*;

    matches!(
        (from, to, actor),
        (Pending, Confirmed, Role::Dealer)
            | (Pending, Cancelled, Role::Dealer | Role::Farmer)
            | (Confirmed, Completed, Role::Dealer)
            | (Confirmed, Cancelled, Role::Dealer)
    )
}

/// Statuses `actor` may move a booking to from `from`.
pub fn allowed_targets(from: BookingStatus, actor: Role) -> Vec<BookingStatus> {
    BookingStatus::ALL
        .into_iter()
        .filter(|to| is_allowed(from, *to, actor))
        .collect()
}
