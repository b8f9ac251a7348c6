use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: String,
    pub booking_id: String,
    pub farmer_id: String,
    pub dealer_id: String,
    pub score: u8,
    pub review: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DealerRating {
    pub dealer_id: String,
    pub average: f64,
    pub count: i64,
}
