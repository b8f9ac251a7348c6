use crate::errors::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, Rating, Role};
use crate::services::conflict::{self, ReservationRequest};
use crate::services::notifier::{self, Transition};
use crate::services::ratings::{self, RatingRequest};
use crate::services::{store, Committed};
use crate::state::AppState;

/// Reserves a slot and tells the dealer about it.
pub async fn request_reservation(
    state: &AppState,
    request: &ReservationRequest,
) -> AppResult<Committed<Booking>> {
    let booking = {
        let db = state.db.lock()?;
        conflict::check_and_reserve(&db, request)?
    };

    let warnings = notifier::notify(
        state.directory.as_ref(),
        state.delivery.as_ref(),
        &booking,
        Transition::Created,
    )
    .await
    .into_iter()
    .collect();

    Ok(Committed {
        record: booking,
        warnings,
    })
}

/// Applies a status change on behalf of `actor` and informs the other party.
///
/// When `actor_id` is given it must be the booking's party for that role, and
/// the account directory must not know the user under a different role.
pub async fn change_status(
    state: &AppState,
    booking_id: &str,
    new_status: BookingStatus,
    actor: Role,
    actor_id: Option<&str>,
) -> AppResult<Committed<Booking>> {
    if let Some(actor_id) = actor_id {
        authorize_actor(state, booking_id, actor, actor_id).await?;
    }

    let booking = {
        let db = state.db.lock()?;
        store::apply_transition(&db, booking_id, new_status, actor)?
    };

    let mut warnings = Vec::new();
    if let Some(transition) = Transition::applied(new_status, actor) {
        warnings.extend(
            notifier::notify(
                state.directory.as_ref(),
                state.delivery.as_ref(),
                &booking,
                transition,
            )
            .await,
        );
    }

    Ok(Committed {
        record: booking,
        warnings,
    })
}

async fn authorize_actor(
    state: &AppState,
    booking_id: &str,
    actor: Role,
    actor_id: &str,
) -> AppResult<()> {
    let booking = {
        let db = state.db.lock()?;
        store::get(&db, booking_id)?
    };

    let party = match actor {
        Role::Farmer => Some(&booking.farmer_id),
        Role::Dealer => Some(&booking.dealer_id),
        Role::Admin => None,
    };
    if party.is_some_and(|p| p != actor_id) {
        return Err(AppError::Forbidden(format!(
            "{actor_id} is not the {actor} on this booking"
        )));
    }

    let profile = state
        .directory
        .resolve_user(actor_id)
        .await
        .map_err(|e| AppError::Internal(format!("account directory lookup failed: {e}")))?;
    if let Some(profile) = profile {
        if profile.role != actor {
            return Err(AppError::Forbidden(format!(
                "{actor_id} is registered as a {}, not a {actor}",
                profile.role
            )));
        }
    }

    Ok(())
}

pub fn get_booking(state: &AppState, booking_id: &str) -> AppResult<Booking> {
    let db = state.db.lock()?;
    store::get(&db, booking_id)
}

pub fn bookings_for_farmer(state: &AppState, farmer_id: &str) -> AppResult<Vec<Booking>> {
    let db = state.db.lock()?;
    store::list_by_farmer(&db, farmer_id)
}

pub fn bookings_for_dealer(state: &AppState, dealer_id: &str) -> AppResult<Vec<Booking>> {
    let db = state.db.lock()?;
    store::list_by_dealer(&db, dealer_id)
}

/// Records a rating, then feeds the dealer aggregate. An aggregate failure is
/// reported as a warning; the rating stays recorded.
pub async fn submit_rating(
    state: &AppState,
    request: &RatingRequest,
) -> AppResult<Committed<Rating>> {
    let rating = {
        let db = state.db.lock()?;
        ratings::record_rating(&db, request)?
    };

    let mut warnings = Vec::new();
    if let Err(e) = state
        .ratings
        .record_for_dealer(&rating.dealer_id, rating.score)
        .await
    {
        tracing::warn!(
            booking_id = %rating.booking_id,
            dealer_id = %rating.dealer_id,
            error = %e,
            "failed to update dealer rating aggregate"
        );
        warnings.push(format!("rating saved, but the dealer summary was not updated: {e}"));
    }

    Ok(Committed {
        record: rating,
        warnings,
    })
}

pub fn can_rate(state: &AppState, booking_id: &str, farmer_id: &str) -> AppResult<bool> {
    let db = state.db.lock()?;
    ratings::can_rate(&db, booking_id, farmer_id)
}
