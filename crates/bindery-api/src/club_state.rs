use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;

use bindery_core::stats;
use bindery_types::models::StatePatch;

use crate::{ApiError, AppState, blocking, resolve_members};

/// The state document, created with empty defaults on first read.
pub async fn get_state(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || Ok(state.db.load_state(&club_id)?)).await?;
    Ok(Json(doc))
}

/// Field-level merge per the store contract: supplied top-level fields
/// replace, omitted fields keep the value read just before the write.
pub async fn patch_state(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(patch): Json<StatePatch>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || Ok(state.db.save_state(&club_id, &patch)?)).await?;
    Ok(Json(doc))
}

/// Derived statistics over the current book, history, and member list.
pub async fn get_stats(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let computed = blocking(move || {
        let members = resolve_members(&state.db, &club_id)?;
        let doc = state.db.load_state(&club_id)?;
        Ok(stats::compute(
            doc.current_book.as_ref(),
            &doc.book_history,
            &members,
            Utc::now(),
        ))
    })
    .await?;

    Ok(Json(computed))
}
