//! Lifecycle operations exposed over HTTP. Every handler runs the same
//! cycle the clients do: load the state document, apply one engine
//! operation, save the whole document, and answer with the post-write
//! read-back so the caller re-renders from reconciled state.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use bindery_core::lifecycle::BookDraft;
use bindery_core::selection;
use bindery_db::Database;
use bindery_types::api::{
    ClearTopicsRequest, DiscussionRequest, MeetingsRequest, ProgressRequest, ProposeBookRequest,
    RateRequest, SelectNextRequest, TopicRequest, VoteRequest,
};
use bindery_types::models::{BookClubState, StatePatch};

use crate::{ApiError, AppState, blocking, resolve_members};

fn persist(db: &Database, club_id: &str, doc: &BookClubState) -> Result<BookClubState, ApiError> {
    Ok(db.save_state(club_id, &StatePatch::full(doc))?)
}

pub async fn propose(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<ProposeBookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        let draft = BookDraft {
            title: req.title,
            author: req.author,
            page_count: req.page_count,
            cover_url: req.cover_url,
            description: req.description,
            category: req.category,
        };
        state.engine.propose_book(&mut doc, draft, &req.proposer_id)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn vote(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let members = resolve_members(&state.db, &club_id)?;
        let mut doc = state.db.load_state(&club_id)?;
        state
            .engine
            .vote_on_book(&mut doc, &members, &req.voter_id, req.vote)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn spin(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let members = resolve_members(&state.db, &club_id)?;
        let mut doc = state.db.load_state(&club_id)?;
        let picked = selection::spin_wheel(&members, &mut rand::rng())?.clone();
        doc.next_selector = Some(picked);
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn select_next(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<SelectNextRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let members = resolve_members(&state.db, &club_id)?;
        let mut doc = state.db.load_state(&club_id)?;
        let picked = selection::select_next_reader(&members, &req.member_id)?.clone();
        doc.next_selector = Some(picked);
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn meetings(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<MeetingsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        state.engine.update_setup(&mut doc, req.meetings)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn start_reading(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        state.engine.start_reading(&mut doc)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn stop_reading(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        state.engine.stop_reading(&mut doc)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn add_topic(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<TopicRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        state.engine.add_discussion_topic(&mut doc, &req.text)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn clear_topics(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<ClearTopicsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        state.engine.clear_discussion_topics(&mut doc, &req.user_id)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn add_discussion(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<DiscussionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let members = resolve_members(&state.db, &club_id)?;
        let mut doc = state.db.load_state(&club_id)?;
        state
            .engine
            .add_discussion(&mut doc, &members, &req.user_id, &req.content)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn progress(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<ProgressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let mut doc = state.db.load_state(&club_id)?;
        state.engine.update_reading_progress(&mut doc, req.current_page)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}

pub async fn rate(
    State(state): State<AppState>,
    Path(club_id): Path<String>,
    Json(req): Json<RateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(move || {
        let members = resolve_members(&state.db, &club_id)?;
        let mut doc = state.db.load_state(&club_id)?;
        state
            .engine
            .rate_book(&mut doc, &members, &req.book_id, &req.user_id, req.rating)?;
        persist(&state.db, &club_id, &doc)
    })
    .await?;

    Ok(Json(doc))
}
