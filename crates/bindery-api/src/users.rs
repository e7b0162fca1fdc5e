use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use bindery_core::ids::fresh_id;
use bindery_types::api::CreateUserRequest;
use bindery_types::models::User;

use crate::{ApiError, AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub email: Option<String>,
    pub id: Option<String>,
}

/// `?email=` or `?id=` resolve a single user (or `null`); no parameters
/// lists everyone.
pub async fn get_users(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let value = blocking(move || {
        if let Some(email) = &query.email {
            return Ok(serde_json::to_value(state.db.find_user_by_email(email)?)
                .map_err(anyhow::Error::from)?);
        }
        if let Some(id) = &query.id {
            return Ok(serde_json::to_value(state.db.find_user_by_id(id)?)
                .map_err(anyhow::Error::from)?);
        }
        Ok(serde_json::to_value(state.db.list_users()?).map_err(anyhow::Error::from)?)
    })
    .await?;

    Ok(Json(value))
}

/// Create-or-return-existing, idempotent by email. The default display name
/// is the email's local part.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.email.trim().is_empty() {
        return Err(ApiError::Validation("Email is required".to_string()));
    }

    let (created, user) = blocking(move || {
        if let Some(existing) = state.db.find_user_by_email(&req.email)? {
            return Ok((false, existing));
        }

        let name = req
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| local_part(&req.email).to_string());
        let user = User {
            id: fresh_id(),
            name,
            email: req.email.clone(),
        };
        state.db.insert_user(&user)?;
        Ok((true, user))
    })
    .await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(user)))
}

fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
