use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use bindery_core::LifecycleError;
use bindery_types::api::ErrorBody;

/// Request-level failure taxonomy. Store failures collapse to a generic 500
/// (detail is logged, never sent); engine rejections keep their reason.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("Internal server error")]
    Upstream(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Lifecycle(e) => match e {
                LifecycleError::Unauthorized => StatusCode::FORBIDDEN,
                LifecycleError::NotFound(_) => StatusCode::NOT_FOUND,
                LifecycleError::InvalidRating => StatusCode::BAD_REQUEST,
                LifecycleError::InvalidTransition(_)
                | LifecycleError::AlreadyVoted
                | LifecycleError::NoMeetings
                | LifecycleError::NoMembers => StatusCode::CONFLICT,
            },
            Self::Upstream(e) => {
                error!("upstream failure: {e:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(
            status_of(ApiError::Validation("missing".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ApiError::NotFound("club".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(ApiError::Lifecycle(LifecycleError::Unauthorized)),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(ApiError::Lifecycle(LifecycleError::AlreadyVoted)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ApiError::Upstream(anyhow::anyhow!("db timeout"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn upstream_detail_is_not_leaked() {
        let body = ApiError::Upstream(anyhow::anyhow!("connection refused (10.0.0.3:27017)"));
        assert_eq!(body.to_string(), "Internal server error");
    }
}
