//! Turns committed booking transitions into outbound notifications.
//!
//! Each transition affects exactly one party, so each produces exactly one
//! event. Delivery failures are reported back as warnings and never touch the
//! booking itself.

use crate::models::{Booking, BookingStatus, NotificationEvent, NotificationKind, Role};
use crate::services::delivery::NotificationDelivery;
use crate::services::directory::{display_name, AccountDirectory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Created,
    Confirmed,
    Completed,
    Cancelled { by: Role },
}

impl Transition {
    /// Maps an applied status change onto the notification it triggers.
    pub fn applied(to: BookingStatus, actor: Role) -> Option<Self> {
        match to {
            BookingStatus::Pending => None,
            BookingStatus::Confirmed => Some(Transition::Confirmed),
            BookingStatus::Completed => Some(Transition::Completed),
            BookingStatus::Cancelled => Some(Transition::Cancelled { by: actor }),
        }
    }
}

/// The party to inform and the party the message is about.
fn parties(booking: &Booking, transition: Transition) -> (&str, &str) {
    match transition {
        Transition::Created | Transition::Cancelled { by: Role::Farmer } => {
            (booking.dealer_id.as_str(), booking.farmer_id.as_str())
        }
        _ => (booking.farmer_id.as_str(), booking.dealer_id.as_str()),
    }
}

pub fn compose(booking: &Booking, transition: Transition, counterpart: &str) -> NotificationEvent {
    let (recipient_id, _) = parties(booking, transition);
    let date = booking.date.format("%Y-%m-%d");
    let part = booking.day_part.label();

    let (kind, title, message) = match transition {
        Transition::Created => {
            let crop = booking.crop_name.as_deref().unwrap_or("produce");
            (
                NotificationKind::BookingRequested,
                "New booking request",
                format!("New booking request for {crop} on {date} ({part}) from {counterpart}"),
            )
        }
        Transition::Confirmed => (
            NotificationKind::BookingConfirmed,
            "Booking confirmed",
            format!("{counterpart} confirmed your booking for {date} ({part})"),
        ),
        Transition::Cancelled { .. } => (
            NotificationKind::BookingCancelled,
            "Booking cancelled",
            format!("{counterpart} cancelled the booking for {date} ({part})"),
        ),
        Transition::Completed => (
            NotificationKind::BookingCompleted,
            "Booking completed",
            format!(
                "Your delivery to {counterpart} on {date} ({part}) is complete. You may now rate this dealer."
            ),
        ),
    };

    NotificationEvent {
        recipient_id: recipient_id.to_string(),
        kind,
        title: title.to_string(),
        message,
        booking_id: booking.id.clone(),
    }
}

/// Emits the notification for a committed transition. Returns a warning
/// message when the outbox append failed.
pub async fn notify(
    directory: &dyn AccountDirectory,
    delivery: &dyn NotificationDelivery,
    booking: &Booking,
    transition: Transition,
) -> Option<String> {
    let (_, about) = parties(booking, transition);
    let counterpart = display_name(directory, about).await;
    let event = compose(booking, transition, &counterpart);

    match delivery.enqueue(&event).await {
        Ok(()) => {
            tracing::debug!(
                booking_id = %booking.id,
                recipient = %event.recipient_id,
                kind = event.kind.as_str(),
                "notification enqueued"
            );
            None
        }
        Err(e) => {
            tracing::warn!(
                booking_id = %booking.id,
                recipient = %event.recipient_id,
                error = %e,
                "failed to enqueue notification"
            );
            Some(format!(
                "booking saved, but notifying {} failed: {e}",
                event.recipient_id
            ))
        }
    }
}
