pub mod actions;
pub mod club_state;
pub mod clubs;
pub mod error;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::error;

use bindery_core::Engine;
use bindery_core::ids::CodeIssuer;
use bindery_db::Database;
use bindery_types::models::Member;

pub use error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub codes: Box<dyn CodeIssuer + Send + Sync>,
    pub engine: Engine,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(users::get_users).post(users::create_user))
        .route(
            "/bookclubs",
            get(clubs::get_clubs)
                .post(clubs::create_club)
                .patch(clubs::patch_club),
        )
        .route("/bookclubs/join", post(clubs::join_club))
        .route(
            "/bookclub-state/{club_id}",
            get(club_state::get_state).patch(club_state::patch_state),
        )
        .route("/bookclub-state/{club_id}/stats", get(club_state::get_stats))
        .route("/bookclub-state/{club_id}/propose", post(actions::propose))
        .route("/bookclub-state/{club_id}/vote", post(actions::vote))
        .route("/bookclub-state/{club_id}/spin", post(actions::spin))
        .route(
            "/bookclub-state/{club_id}/select-next",
            post(actions::select_next),
        )
        .route("/bookclub-state/{club_id}/meetings", post(actions::meetings))
        .route(
            "/bookclub-state/{club_id}/start-reading",
            post(actions::start_reading),
        )
        .route(
            "/bookclub-state/{club_id}/stop-reading",
            post(actions::stop_reading),
        )
        .route("/bookclub-state/{club_id}/topics", post(actions::add_topic))
        .route(
            "/bookclub-state/{club_id}/topics/clear",
            post(actions::clear_topics),
        )
        .route(
            "/bookclub-state/{club_id}/discussions",
            post(actions::add_discussion),
        )
        .route("/bookclub-state/{club_id}/progress", post(actions::progress))
        .route("/bookclub-state/{club_id}/rate", post(actions::rate))
        .with_state(state)
}

/// Run a store-touching closure off the async runtime. The closure's own
/// errors keep their taxonomy; a lost worker is an upstream failure.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result,
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            Err(ApiError::Upstream(anyhow::anyhow!("blocking task failed")))
        }
    }
}

/// The club's member list, re-resolved from the users collection. Ids
/// without a user record are skipped, mirroring the client's tolerant
/// member fetch.
pub(crate) fn resolve_members(db: &Database, club_id: &str) -> Result<Vec<Member>, ApiError> {
    let club = db
        .find_club_by_id(club_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Book club not found: {club_id}")))?;

    let mut members = Vec::new();
    for id in &club.members {
        if let Some(user) = db.find_user_by_id(id)? {
            members.push(Member::from(user));
        }
    }
    Ok(members)
}
