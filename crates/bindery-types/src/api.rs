use serde::{Deserialize, Serialize};

use crate::models::{Meeting, Vote};

// -- Users --

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

// -- Book clubs --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateClubRequest {
    pub name: String,
    pub owner_id: String,
}

/// Generic owner-directed field patch, matching the original wire contract:
/// `updates` is merged key-by-key into the stored club document.
#[derive(Debug, Deserialize)]
pub struct PatchClubRequest {
    pub id: String,
    pub updates: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinClubRequest {
    pub invite_code: String,
    pub user_id: String,
}

// -- Lifecycle actions --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposeBookRequest {
    pub proposer_id: String,
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub voter_id: String,
    pub vote: Vote,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectNextRequest {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MeetingsRequest {
    pub meetings: Vec<Meeting>,
}

#[derive(Debug, Deserialize)]
pub struct TopicRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearTopicsRequest {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionRequest {
    pub user_id: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub current_page: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub book_id: String,
    pub user_id: String,
    pub rating: u8,
}

// -- Errors --

/// Error body shape shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
