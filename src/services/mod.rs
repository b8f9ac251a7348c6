pub mod aggregate;
pub mod bookings;
pub mod calendar;
pub mod conflict;
pub mod delivery;
pub mod directory;
pub mod notifier;
pub mod ratings;
pub mod state_machine;
pub mod store;

use serde::Serialize;

/// A committed write plus any side effects that failed after the commit.
#[derive(Debug, Clone, Serialize)]
pub struct Committed<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
