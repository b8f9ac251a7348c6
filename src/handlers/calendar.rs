use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::errors::AppResult;
use crate::services::calendar::generate_ics;
use crate::services::directory::display_name;
use crate::services::store;
use crate::state::AppState;

// GET /calendar/:booking_id
pub async fn download_ics(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    // Strip .ics suffix if present
    let booking_id = raw_id.strip_suffix(".ics").unwrap_or(&raw_id);

    let booking = {
        let db = state.db.lock()?;
        store::get(&db, booking_id)?
    };

    let dealer_name = display_name(state.directory.as_ref(), &booking.dealer_id).await;
    let ics = generate_ics(&booking, &dealer_name);
    let filename = format!("booking-{booking_id}.ics");

    Ok((
        [
            (header::CONTENT_TYPE, "text/calendar; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        ics,
    )
        .into_response())
}
