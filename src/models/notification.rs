use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingRequested,
    BookingConfirmed,
    BookingCancelled,
    BookingCompleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingRequested => "booking_requested",
            NotificationKind::BookingConfirmed => "booking_confirmed",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::BookingCompleted => "booking_completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "booking_requested" => Some(NotificationKind::BookingRequested),
            "booking_confirmed" => Some(NotificationKind::BookingConfirmed),
            "booking_cancelled" => Some(NotificationKind::BookingCancelled),
            "booking_completed" => Some(NotificationKind::BookingCompleted),
            _ => None,
        }
    }
}

/// Outbound event handed to the delivery collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub booking_id: String,
}

/// An event as recorded in the outbox table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub booking_id: String,
    pub created_at: NaiveDateTime,
}
