use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only time granularity a dealer can be booked at.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayPart {
    Morning,
    Afternoon,
    Evening,
}

impl DayPart {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayPart::Morning => "morning",
            DayPart::Afternoon => "afternoon",
            DayPart::Evening => "evening",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Some(DayPart::Morning),
            "afternoon" => Some(DayPart::Afternoon),
            "evening" => Some(DayPart::Evening),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DayPart::Morning => "Morning",
            DayPart::Afternoon => "Afternoon",
            DayPart::Evening => "Evening",
        }
    }

    /// Start and end hour (24h clock) of the window, used for calendar exports.
    pub fn hours(&self) -> (u32, u32) {
        match self {
            DayPart::Morning => (8, 12),
            DayPart::Afternoon => (12, 16),
            DayPart::Evening => (16, 20),
        }
    }
}

/// Canonical identity of a reservable slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SlotKey {
    pub dealer_id: String,
    pub date: NaiveDate,
    pub day_part: DayPart,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSlot {
    #[error("a dealer must be selected")]
    MissingDealer,

    #[error("'{0}' is not a valid calendar date")]
    MalformedDate(String),

    #[error("{date} is in the past, the earliest bookable day is {today}")]
    PastDate { date: NaiveDate, today: NaiveDate },

    #[error("'{0}' is not a day-part, choose morning, afternoon or evening")]
    UnknownDayPart(String),
}

/// Builds the slot key against the server's current UTC day.
pub fn slot_key(dealer_id: &str, date: &str, day_part: &str) -> Result<SlotKey, InvalidSlot> {
    slot_key_on(dealer_id, date, day_part, Utc::now().date_naive())
}

pub fn slot_key_on(
    dealer_id: &str,
    date: &str,
    day_part: &str,
    today: NaiveDate,
) -> Result<SlotKey, InvalidSlot> {
    let dealer_id = dealer_id.trim();
    if dealer_id.is_empty() {
        return Err(InvalidSlot::MissingDealer);
    }

    let date = parse_calendar_date(date)
        .ok_or_else(|| InvalidSlot::MalformedDate(date.trim().to_string()))?;
    if date < today {
        return Err(InvalidSlot::PastDate { date, today });
    }

    let day_part =
        DayPart::parse(day_part).ok_or_else(|| InvalidSlot::UnknownDayPart(day_part.to_string()))?;

    Ok(SlotKey {
        dealer_id: dealer_id.to_string(),
        date,
        day_part,
    })
}

/// Accepts a bare date or a date-time and keeps only the calendar day.
pub fn parse_calendar_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_slot_key_normalizes_time_component() {
        let today = day("2025-03-01");
        let a = slot_key_on("dealer-1", "2025-03-10", "Morning", today).unwrap();
        let b = slot_key_on("dealer-1", "2025-03-10T17:45:00", "morning", today).unwrap();
        let c = slot_key_on(" dealer-1 ", "2025-03-10T06:00:00+05:30", " MORNING ", today).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.date, day("2025-03-10"));
        assert_eq!(a.day_part, DayPart::Morning);
    }

    #[test]
    fn test_today_is_bookable() {
        let today = day("2025-03-10");
        assert!(slot_key_on("dealer-1", "2025-03-10", "evening", today).is_ok());
    }

    #[test]
    fn test_past_date_rejected() {
        let today = day("2025-03-10");
        let err = slot_key_on("dealer-1", "2025-03-09", "evening", today).unwrap_err();
        assert_eq!(
            err,
            InvalidSlot::PastDate {
                date: day("2025-03-09"),
                today
            }
        );
    }

    #[test]
    fn test_unknown_day_part_rejected() {
        let today = day("2025-03-01");
        let err = slot_key_on("dealer-1", "2025-03-10", "night", today).unwrap_err();
        assert!(matches!(err, InvalidSlot::UnknownDayPart(ref p) if p == "night"));
    }

    #[test]
    fn test_malformed_date_rejected() {
        let today = day("2025-03-01");
        for bad in ["", "tomorrow", "2025-02-30", "10/03/2025"] {
            let err = slot_key_on("dealer-1", bad, "morning", today).unwrap_err();
            assert!(matches!(err, InvalidSlot::MalformedDate(_)), "{bad} should be malformed");
        }
    }

    #[test]
    fn test_missing_dealer_rejected() {
        let today = day("2025-03-01");
        let err = slot_key_on("  ", "2025-03-10", "morning", today).unwrap_err();
        assert_eq!(err, InvalidSlot::MissingDealer);
    }

    #[test]
    fn test_different_day_parts_are_different_slots() {
        let today = day("2025-03-01");
        let morning = slot_key_on("dealer-1", "2025-03-10", "morning", today).unwrap();
        let afternoon = slot_key_on("dealer-1", "2025-03-10", "afternoon", today).unwrap();
        assert_ne!(morning, afternoon);
    }

    #[test]
    fn test_slot_key_uses_current_day() {
        let today = Utc::now().date_naive();
        let tomorrow = today.succ_opt().unwrap();
        let yesterday = today.pred_opt().unwrap();

        let key = slot_key("dealer-1", &tomorrow.to_string(), "morning").unwrap();
        assert_eq!(key.date, tomorrow);
        assert!(matches!(
            slot_key("dealer-1", &yesterday.to_string(), "morning"),
            Err(InvalidSlot::PastDate { .. })
        ));
    }
}
