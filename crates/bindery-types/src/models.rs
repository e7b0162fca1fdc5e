use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A registered account. Created once per unique email and immutable after;
/// everything else references users by id, never by embedded copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A user as seen inside a club — a denormalized copy that is always
/// re-resolved from the users collection, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<User> for Member {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookClub {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub members: Vec<String>,
    pub invite_code: String,
}

/// Scheduled during the setup phase, owned by the book it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub target_page: u32,
}

/// Free-form comment on the current book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionPost {
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub timestamp: String,
}

/// Agenda item for the next meeting. Append-only while reading; the
/// selector may clear the whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionTopic {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Approve,
    Veto,
}

/// Lifecycle states. `Approved` is a transient label some callers put on
/// the wire; the engine itself moves `proposed` straight to `setup` once
/// the vote concludes favorably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Proposed,
    Approved,
    Setup,
    Reading,
    Completed,
    Vetoed,
}

impl BookStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Vetoed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    /// Member id of the proposer.
    pub selected_by: String,
    pub status: BookStatus,
    /// ISO-8601; empty until reading starts.
    #[serde(default)]
    pub start_date: String,
    /// ISO-8601; empty until the book completes.
    #[serde(default)]
    pub end_date: String,
    /// userId -> 1..=5. Last write per user wins.
    #[serde(default)]
    pub ratings: HashMap<String, u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub current_page: u32,
    #[serde(default)]
    pub meetings: Vec<Meeting>,
    #[serde(default)]
    pub discussions: Vec<DiscussionPost>,
    #[serde(default)]
    pub discussion_topics: Vec<DiscussionTopic>,
    /// memberId -> vote; keys never include `selected_by`.
    #[serde(default)]
    pub votes: HashMap<String, Vote>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// The per-club persistence aggregate: the unit of read-modify-write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookClubState {
    pub book_club_id: String,
    pub current_book: Option<Book>,
    pub book_history: Vec<Book>,
    pub next_selector: Option<Member>,
}

impl BookClubState {
    pub fn empty(book_club_id: impl Into<String>) -> Self {
        Self {
            book_club_id: book_club_id.into(),
            current_book: None,
            book_history: Vec::new(),
            next_selector: None,
        }
    }
}

/// Partial update for the state document. A field present in the JSON body
/// (including an explicit `null` for the nullable fields) replaces the stored
/// field wholesale; an absent field keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatePatch {
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_book: Option<Option<Book>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_history: Option<Vec<Book>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_selector: Option<Option<Member>>,
}

impl StatePatch {
    /// Full-state patch as produced by a client after an engine operation.
    pub fn full(state: &BookClubState) -> Self {
        Self {
            current_book: Some(state.current_book.clone()),
            book_history: Some(state.book_history.clone()),
            next_selector: Some(state.next_selector.clone()),
        }
    }
}

/// Distinguishes a missing field from an explicit `null`.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_round_trips_wire_field_names() {
        let json = r#"{
            "id": "1716312345678",
            "title": "Piranesi",
            "author": "Susanna Clarke",
            "selectedBy": "u1",
            "status": "proposed",
            "startDate": "",
            "endDate": "",
            "ratings": {},
            "pageCount": 272,
            "currentPage": 0,
            "meetings": [],
            "discussions": [],
            "discussionTopics": [],
            "votes": {}
        }"#;

        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.status, BookStatus::Proposed);
        assert_eq!(book.selected_by, "u1");
        assert_eq!(book.page_count, 272);

        let out = serde_json::to_value(&book).unwrap();
        assert_eq!(out["selectedBy"], "u1");
        assert_eq!(out["pageCount"], 272);
        assert_eq!(out["status"], "proposed");
        // absent optionals stay off the wire
        assert!(out.get("coverUrl").is_none());
    }

    #[test]
    fn book_tolerates_sparse_documents() {
        // Documents written by older clients omit the collection fields.
        let json = r#"{
            "id": "b1",
            "title": "Dune",
            "author": "Frank Herbert",
            "selectedBy": "u2",
            "status": "reading"
        }"#;

        let book: Book = serde_json::from_str(json).unwrap();
        assert!(book.meetings.is_empty());
        assert!(book.votes.is_empty());
        assert_eq!(book.start_date, "");
    }

    #[test]
    fn vote_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Vote::Approve).unwrap(), "\"approve\"");
        assert_eq!(serde_json::to_string(&Vote::Veto).unwrap(), "\"veto\"");
    }

    #[test]
    fn state_patch_distinguishes_null_from_absent() {
        let patch: StatePatch = serde_json::from_str(r#"{"currentBook": null}"#).unwrap();
        assert_eq!(patch.current_book, Some(None));
        assert!(patch.book_history.is_none());
        assert!(patch.next_selector.is_none());

        let patch: StatePatch = serde_json::from_str(r#"{"bookHistory": []}"#).unwrap();
        assert!(patch.current_book.is_none());
        assert_eq!(patch.book_history, Some(vec![]));
    }

    #[test]
    fn state_patch_ignores_unknown_fields() {
        // Clients send the whole document back, bookClubId included.
        let patch: StatePatch =
            serde_json::from_str(r#"{"bookClubId": "c1", "nextSelector": null}"#).unwrap();
        assert_eq!(patch.next_selector, Some(None));
    }
}
