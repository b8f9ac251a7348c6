use crate::models::{Booking, BookingStatus};

pub fn generate_ics(booking: &Booking, dealer_name: &str) -> String {
    let (start_hour, end_hour) = booking.day_part.hours();
    let day = booking.date.format("%Y%m%d");
    let dtstart = format!("{day}T{start_hour:02}0000");
    let dtend = format!("{day}T{end_hour:02}0000");
    let dtstamp = booking.updated_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@agribook", booking.id);

    let crop = booking.crop_name.as_deref().unwrap_or("produce");
    let summary = escape_text(&format!("Deliver {crop} to {dealer_name}"));
    let description = booking
        .notes
        .as_deref()
        .map(escape_text)
        .unwrap_or_else(|| "No additional notes".to_string());
    let status = match booking.status {
        BookingStatus::Pending => "TENTATIVE",
        BookingStatus::Confirmed | BookingStatus::Completed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Agribook//Produce Delivery//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

fn escape_text(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}
