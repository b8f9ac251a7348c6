use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::db::queries;
use crate::errors::AppResult;
use crate::models::{DealerRating, Rating};
use crate::services::bookings;
use crate::services::ratings::RatingRequest;
use crate::services::Committed;
use crate::state::AppState;

use super::AppJson;

// POST /api/ratings
pub async fn create_rating(
    State(state): State<Arc<AppState>>,
    AppJson(body): AppJson<RatingRequest>,
) -> AppResult<(StatusCode, Json<Committed<Rating>>)> {
    let committed = bookings::submit_rating(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(committed)))
}

// GET /api/dealers/:id/rating
pub async fn dealer_rating(
    State(state): State<Arc<AppState>>,
    Path(dealer_id): Path<String>,
) -> AppResult<Json<DealerRating>> {
    let summary = {
        let db = state.db.lock()?;
        queries::get_dealer_rating(&db, &dealer_id)?
    };

    Ok(Json(summary.unwrap_or(DealerRating {
        dealer_id,
        average: 0.0,
        count: 0,
    })))
}
