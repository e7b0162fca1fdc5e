use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::warn;

use bindery_core::ids::{CodeIssuer, fresh_id};
use bindery_db::Database;
use bindery_types::api::{CreateClubRequest, JoinClubRequest, PatchClubRequest};
use bindery_types::models::BookClub;

use crate::{ApiError, AppState, blocking};

/// Bounded retries against an invite-code collision before giving up.
const CODE_ATTEMPTS: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubQuery {
    pub invite_code: Option<String>,
    pub user_id: Option<String>,
}

/// `?inviteCode=` resolves a single club (or `null`); `?userId=` lists the
/// clubs that user belongs to.
pub async fn get_clubs(
    State(state): State<AppState>,
    Query(query): Query<ClubQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let value = blocking(move || {
        if let Some(code) = &query.invite_code {
            return Ok(serde_json::to_value(state.db.find_club_by_invite_code(code)?)
                .map_err(anyhow::Error::from)?);
        }
        if let Some(user_id) = &query.user_id {
            return Ok(serde_json::to_value(state.db.list_clubs_for_user(user_id)?)
                .map_err(anyhow::Error::from)?);
        }
        Err(ApiError::Validation(
            "Either inviteCode or userId is required".to_string(),
        ))
    })
    .await?;

    Ok(Json(value))
}

pub async fn create_club(
    State(state): State<AppState>,
    Json(req): Json<CreateClubRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() || req.owner_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "Name and ownerId are required".to_string(),
        ));
    }

    let club = blocking(move || {
        let invite_code = issue_unique_code(&state.db, state.codes.as_ref())?;
        let club = BookClub {
            id: fresh_id(),
            name: req.name,
            owner_id: req.owner_id.clone(),
            members: vec![req.owner_id],
            invite_code,
        };
        state.db.insert_club(&club)?;
        Ok(club)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(club)))
}

/// Owner-directed field patch: `updates` is merged key-by-key into the
/// stored document. The club id itself is not patchable.
pub async fn patch_club(
    State(state): State<AppState>,
    Json(req): Json<PatchClubRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.id.trim().is_empty() {
        return Err(ApiError::Validation("Book club ID is required".to_string()));
    }
    let Some(updates) = req.updates.as_object().cloned() else {
        return Err(ApiError::Validation("updates must be an object".to_string()));
    };

    let club = blocking(move || {
        let club = state
            .db
            .find_club_by_id(&req.id)?
            .ok_or_else(|| ApiError::NotFound("Book club not found".to_string()))?;

        let mut doc = serde_json::to_value(&club).map_err(anyhow::Error::from)?;
        if let Some(obj) = doc.as_object_mut() {
            for (key, value) in updates {
                obj.insert(key, value);
            }
            obj.insert("id".to_string(), serde_json::Value::String(club.id.clone()));
        }

        let patched: BookClub = serde_json::from_value(doc)
            .map_err(|e| ApiError::Validation(format!("Invalid club patch: {e}")))?;
        state.db.update_club(&patched)?;
        Ok(patched)
    })
    .await?;

    Ok(Json(club))
}

/// Resolver-level join: look the club up by invite code and append the
/// member. No duplicate check — rejoining re-adds the id.
pub async fn join_club(
    State(state): State<AppState>,
    Json(req): Json<JoinClubRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.invite_code.trim().is_empty() || req.user_id.trim().is_empty() {
        return Err(ApiError::Validation(
            "inviteCode and userId are required".to_string(),
        ));
    }

    let club = blocking(move || {
        let mut club = state
            .db
            .find_club_by_invite_code(&req.invite_code)?
            .ok_or_else(|| ApiError::NotFound("Invalid invite code".to_string()))?;

        club.members.push(req.user_id);
        state.db.update_club(&club)?;
        Ok(club)
    })
    .await?;

    Ok(Json(club))
}

fn issue_unique_code(db: &Database, codes: &(dyn CodeIssuer + Send + Sync)) -> Result<String, ApiError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = codes.issue();
        if db.find_club_by_invite_code(&code)?.is_none() {
            return Ok(code);
        }
        warn!("invite code collision on {}, retrying", code);
    }
    Err(ApiError::Upstream(anyhow::anyhow!(
        "could not allocate a unique invite code"
    )))
}
