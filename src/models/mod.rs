pub mod booking;
pub mod notification;
pub mod rating;
pub mod slot;
pub mod user;

use chrono::{NaiveDateTime, SubsecRound, Utc};

pub use booking::{Booking, BookingStatus};
pub use notification::{Notification, NotificationEvent, NotificationKind};
pub use rating::{DealerRating, Rating};
pub use slot::{slot_key, slot_key_on, DayPart, InvalidSlot, SlotKey};
pub use user::{Role, UserProfile};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server time truncated to the precision timestamps are stored with.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}
