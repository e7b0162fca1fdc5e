use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::debug;

use bindery_types::models::{
    Book, BookClubState, BookStatus, DiscussionPost, DiscussionTopic, Meeting, Member, Vote,
};

use crate::ids::fresh_id;

/// Why a guarded operation was rejected. Every precondition failure is an
/// explicit result, never a silent no-op; the aggregate is untouched on `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("operation not permitted for this member")]
    Unauthorized,
    #[error("invalid transition: {0}")]
    InvalidTransition(&'static str),
    #[error("member has already voted on this proposal")]
    AlreadyVoted,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rating must be an integer between 1 and 5")]
    InvalidRating,
    #[error("at least one meeting must be scheduled before reading starts")]
    NoMeetings,
    #[error("the club has no members")]
    NoMembers,
}

/// Whether the selector may rate their own pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatingEligibility {
    /// Original behavior: any member rates any book.
    #[default]
    AllMembers,
    ExcludeSelector,
}

/// What happens to `nextSelector` when a proposal is vetoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VetoedProposerPolicy {
    /// Original behavior: the selector is kept and proposes again.
    #[default]
    RetainSelector,
    /// The club must pick a fresh selector before the next proposal.
    RequireReselection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifecyclePolicy {
    pub rating_eligibility: RatingEligibility,
    pub vetoed_proposer: VetoedProposerPolicy,
}

/// Result of a vote once registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Not every eligible member has voted yet.
    Pending,
    /// All votes in, vetoes did not reach a strict majority: setup begins.
    Approved,
    /// All votes in, vetoes reached a strict majority.
    Vetoed,
}

/// Everything a proposal carries besides the engine-owned fields.
#[derive(Debug, Clone, Default)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub page_count: u32,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// The lifecycle state machine. Operates on the in-memory aggregate; the
/// caller persists the whole document afterwards and reloads to reconcile.
#[derive(Debug, Clone, Copy, Default)]
pub struct Engine {
    pub policy: LifecyclePolicy,
}

impl Engine {
    pub fn new(policy: LifecyclePolicy) -> Self {
        Self { policy }
    }

    /// Idle (or vetoed) -> proposed. Only the pending selector may propose.
    pub fn propose_book(
        &self,
        state: &mut BookClubState,
        draft: BookDraft,
        proposer_id: &str,
    ) -> Result<(), LifecycleError> {
        let is_selector = state
            .next_selector
            .as_ref()
            .is_some_and(|m| m.id == proposer_id);
        if !is_selector {
            return Err(LifecycleError::Unauthorized);
        }

        if let Some(book) = &state.current_book {
            if book.status != BookStatus::Vetoed {
                return Err(LifecycleError::InvalidTransition(
                    "a book is already in progress",
                ));
            }
        }

        // A replaced vetoed proposal is dropped, not archived.
        state.current_book = Some(Book {
            id: fresh_id(),
            title: draft.title,
            author: draft.author,
            selected_by: proposer_id.to_string(),
            status: BookStatus::Proposed,
            start_date: String::new(),
            end_date: String::new(),
            ratings: Default::default(),
            cover_url: draft.cover_url,
            page_count: draft.page_count,
            current_page: 0,
            meetings: Vec::new(),
            discussions: Vec::new(),
            discussion_topics: Vec::new(),
            votes: Default::default(),
            description: draft.description,
            category: draft.category,
        });

        Ok(())
    }

    /// Registers one vote, then tallies once every eligible member (all
    /// members except the proposer) has voted. Exactly half vetoing is not
    /// enough to reject: the book is vetoed only when vetoes exceed half.
    pub fn vote_on_book(
        &self,
        state: &mut BookClubState,
        members: &[Member],
        voter_id: &str,
        vote: Vote,
    ) -> Result<VoteOutcome, LifecycleError> {
        let outcome = {
            let book = state
                .current_book
                .as_mut()
                .ok_or(LifecycleError::InvalidTransition("no book has been proposed"))?;

            if book.status != BookStatus::Proposed {
                return Err(LifecycleError::InvalidTransition(
                    "voting is only open on a proposed book",
                ));
            }
            if voter_id == book.selected_by {
                return Err(LifecycleError::Unauthorized);
            }
            if !members.iter().any(|m| m.id == voter_id) {
                return Err(LifecycleError::NotFound(format!("member {voter_id}")));
            }
            if book.votes.contains_key(voter_id) {
                return Err(LifecycleError::AlreadyVoted);
            }

            book.votes.insert(voter_id.to_string(), vote);

            let eligible = members.iter().filter(|m| m.id != book.selected_by).count();
            if book.votes.len() < eligible {
                VoteOutcome::Pending
            } else {
                let veto_count = book.votes.values().filter(|v| **v == Vote::Veto).count();
                // ties favor approval: vetoed only when 2 * vetoes > eligible
                if 2 * veto_count <= eligible {
                    book.status = BookStatus::Setup;
                    debug!(votes = eligible, vetoes = veto_count, "proposal approved");
                    VoteOutcome::Approved
                } else {
                    book.status = BookStatus::Vetoed;
                    debug!(votes = eligible, vetoes = veto_count, "proposal vetoed");
                    VoteOutcome::Vetoed
                }
            }
        };

        match outcome {
            VoteOutcome::Approved => state.next_selector = None,
            VoteOutcome::Vetoed => {
                if self.policy.vetoed_proposer == VetoedProposerPolicy::RequireReselection {
                    state.next_selector = None;
                }
            }
            VoteOutcome::Pending => {}
        }

        Ok(outcome)
    }

    /// Replaces the meeting schedule, earliest first. Idempotent within the
    /// setup phase.
    pub fn update_setup(
        &self,
        state: &mut BookClubState,
        mut meetings: Vec<Meeting>,
    ) -> Result<(), LifecycleError> {
        let book = current_in(state, BookStatus::Setup, "meetings can only be scheduled during setup")?;

        meetings.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
        book.meetings = meetings;
        book.status = BookStatus::Setup;

        Ok(())
    }

    /// Setup -> reading, once at least one meeting exists. Stamps the start
    /// date.
    pub fn start_reading(&self, state: &mut BookClubState) -> Result<(), LifecycleError> {
        let book = current_in(state, BookStatus::Setup, "reading can only start from setup")?;

        if book.meetings.is_empty() {
            return Err(LifecycleError::NoMeetings);
        }

        book.status = BookStatus::Reading;
        book.start_date = now_iso();

        Ok(())
    }

    pub fn add_discussion_topic(
        &self,
        state: &mut BookClubState,
        text: &str,
    ) -> Result<(), LifecycleError> {
        let book = current_in(state, BookStatus::Reading, "topics are only open while reading")?;

        book.discussion_topics.push(DiscussionTopic {
            id: fresh_id(),
            text: text.to_string(),
            created_at: now_iso(),
        });

        Ok(())
    }

    /// Selector-only bulk clear of the topic list.
    pub fn clear_discussion_topics(
        &self,
        state: &mut BookClubState,
        actor_id: &str,
    ) -> Result<(), LifecycleError> {
        let book = current_in(state, BookStatus::Reading, "topics are only open while reading")?;

        if actor_id != book.selected_by {
            return Err(LifecycleError::Unauthorized);
        }

        book.discussion_topics.clear();
        Ok(())
    }

    pub fn add_discussion(
        &self,
        state: &mut BookClubState,
        members: &[Member],
        user_id: &str,
        content: &str,
    ) -> Result<(), LifecycleError> {
        if !members.iter().any(|m| m.id == user_id) {
            return Err(LifecycleError::NotFound(format!("member {user_id}")));
        }

        let book = current_in(state, BookStatus::Reading, "discussion is only open while reading")?;

        book.discussions.push(DiscussionPost {
            id: fresh_id(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            timestamp: now_iso(),
        });

        Ok(())
    }

    pub fn update_reading_progress(
        &self,
        state: &mut BookClubState,
        current_page: u32,
    ) -> Result<(), LifecycleError> {
        let book = current_in(state, BookStatus::Reading, "progress only moves while reading")?;

        book.current_page = current_page;
        Ok(())
    }

    /// Reading -> completed. The book moves into history and the club goes
    /// idle; a fresh selector must be chosen before the next proposal.
    pub fn stop_reading(&self, state: &mut BookClubState) -> Result<(), LifecycleError> {
        {
            let book = current_in(state, BookStatus::Reading, "only a book being read can complete")?;
            book.status = BookStatus::Completed;
            book.end_date = now_iso();
        }

        if let Some(completed) = state.current_book.take() {
            debug!(book = %completed.id, "book completed");
            state.book_history.push(completed);
        }

        Ok(())
    }

    /// Rates the current book or any history entry, regardless of status.
    /// One entry per user; the last rating supplied wins.
    pub fn rate_book(
        &self,
        state: &mut BookClubState,
        members: &[Member],
        book_id: &str,
        user_id: &str,
        rating: u8,
    ) -> Result<(), LifecycleError> {
        if !(1..=5).contains(&rating) {
            return Err(LifecycleError::InvalidRating);
        }
        if !members.iter().any(|m| m.id == user_id) {
            return Err(LifecycleError::NotFound(format!("member {user_id}")));
        }

        let book = match &mut state.current_book {
            Some(b) if b.id == book_id => b,
            _ => state
                .book_history
                .iter_mut()
                .find(|b| b.id == book_id)
                .ok_or_else(|| LifecycleError::NotFound(format!("book {book_id}")))?,
        };

        if self.policy.rating_eligibility == RatingEligibility::ExcludeSelector
            && book.selected_by == user_id
        {
            return Err(LifecycleError::Unauthorized);
        }

        book.ratings.insert(user_id.to_string(), rating);
        Ok(())
    }
}

/// The current book, required to be in `expected` status.
fn current_in<'a>(
    state: &'a mut BookClubState,
    expected: BookStatus,
    msg: &'static str,
) -> Result<&'a mut Book, LifecycleError> {
    let book = state
        .current_book
        .as_mut()
        .ok_or(LifecycleError::InvalidTransition("no book has been proposed"))?;

    if book.status != expected {
        return Err(LifecycleError::InvalidTransition(msg));
    }
    Ok(book)
}

/// ISO-8601 with milliseconds, the format the original clients wrote.
fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str) -> Member {
        Member {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@example.com"),
        }
    }

    fn members(ids: &[&str]) -> Vec<Member> {
        ids.iter().map(|id| member(id)).collect()
    }

    fn draft(title: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Anon".to_string(),
            page_count: 300,
            ..Default::default()
        }
    }

    fn state_with_selector(id: &str) -> BookClubState {
        let mut state = BookClubState::empty("c1");
        state.next_selector = Some(member(id));
        state
    }

    /// Drive a fresh state to `reading` with u1 as proposer, u2/u3 approving.
    fn reading_state() -> BookClubState {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = state_with_selector("u1");

        engine.propose_book(&mut state, draft("Solaris"), "u1").unwrap();
        engine.vote_on_book(&mut state, &club, "u2", Vote::Approve).unwrap();
        engine.vote_on_book(&mut state, &club, "u3", Vote::Approve).unwrap();
        engine
            .update_setup(
                &mut state,
                vec![Meeting {
                    date: "2026-09-01".to_string(),
                    start_time: "19:00".to_string(),
                    end_time: "20:30".to_string(),
                    location: None,
                    notes: None,
                    target_page: 120,
                }],
            )
            .unwrap();
        engine.start_reading(&mut state).unwrap();
        state
    }

    #[test]
    fn propose_requires_the_pending_selector() {
        let engine = Engine::default();
        let mut state = state_with_selector("u1");

        assert_eq!(
            engine.propose_book(&mut state, draft("Dune"), "u2"),
            Err(LifecycleError::Unauthorized)
        );
        assert!(state.current_book.is_none());

        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();
        let book = state.current_book.as_ref().unwrap();
        assert_eq!(book.status, BookStatus::Proposed);
        assert_eq!(book.selected_by, "u1");
        assert!(book.votes.is_empty() && book.meetings.is_empty());
    }

    #[test]
    fn propose_with_no_selector_is_unauthorized() {
        let engine = Engine::default();
        let mut state = BookClubState::empty("c1");
        assert_eq!(
            engine.propose_book(&mut state, draft("Dune"), "u1"),
            Err(LifecycleError::Unauthorized)
        );
    }

    #[test]
    fn propose_over_an_active_book_is_rejected() {
        let engine = Engine::default();
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert!(matches!(
            engine.propose_book(&mut state, draft("Emma"), "u1"),
            Err(LifecycleError::InvalidTransition(_))
        ));
    }

    #[test]
    fn propose_replaces_a_vetoed_book() {
        let engine = Engine::default();
        let club = members(&["u1", "u2"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();
        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u2", Vote::Veto).unwrap(),
            VoteOutcome::Vetoed
        );

        // default policy retains the selector, who proposes again
        engine.propose_book(&mut state, draft("Emma"), "u1").unwrap();
        let book = state.current_book.as_ref().unwrap();
        assert_eq!(book.title, "Emma");
        assert_eq!(book.status, BookStatus::Proposed);
    }

    #[test]
    fn self_vote_never_registers() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u1", Vote::Approve),
            Err(LifecycleError::Unauthorized)
        );
        assert!(state.current_book.as_ref().unwrap().votes.is_empty());
    }

    #[test]
    fn non_member_vote_is_rejected() {
        let engine = Engine::default();
        let club = members(&["u1", "u2"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert!(matches!(
            engine.vote_on_book(&mut state, &club, "u9", Vote::Approve),
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[test]
    fn double_vote_is_rejected_and_first_stands() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        engine.vote_on_book(&mut state, &club, "u2", Vote::Approve).unwrap();
        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u2", Vote::Veto),
            Err(LifecycleError::AlreadyVoted)
        );
        assert_eq!(
            state.current_book.as_ref().unwrap().votes["u2"],
            Vote::Approve
        );
    }

    #[test]
    fn tally_waits_for_every_eligible_member() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u2", Vote::Approve).unwrap(),
            VoteOutcome::Pending
        );
        assert_eq!(
            state.current_book.as_ref().unwrap().status,
            BookStatus::Proposed
        );
    }

    #[test]
    fn exact_half_veto_still_approves() {
        // 4 eligible voters, 2 veto + 2 approve -> setup, not vetoed
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3", "u4", "u5"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        engine.vote_on_book(&mut state, &club, "u2", Vote::Veto).unwrap();
        engine.vote_on_book(&mut state, &club, "u3", Vote::Veto).unwrap();
        engine.vote_on_book(&mut state, &club, "u4", Vote::Approve).unwrap();
        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u5", Vote::Approve).unwrap(),
            VoteOutcome::Approved
        );

        assert_eq!(state.current_book.as_ref().unwrap().status, BookStatus::Setup);
        assert!(state.next_selector.is_none(), "selector clears on approval");
    }

    #[test]
    fn veto_majority_rejects() {
        // 3 eligible, 2 veto -> vetoed
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3", "u4"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        engine.vote_on_book(&mut state, &club, "u2", Vote::Veto).unwrap();
        engine.vote_on_book(&mut state, &club, "u3", Vote::Veto).unwrap();
        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u4", Vote::Approve).unwrap(),
            VoteOutcome::Vetoed
        );
        assert_eq!(state.current_book.as_ref().unwrap().status, BookStatus::Vetoed);
    }

    #[test]
    fn veto_policy_controls_the_selector() {
        let club = members(&["u1", "u2"]);

        let retain = Engine::default();
        let mut state = state_with_selector("u1");
        retain.propose_book(&mut state, draft("Dune"), "u1").unwrap();
        retain.vote_on_book(&mut state, &club, "u2", Vote::Veto).unwrap();
        assert_eq!(state.next_selector.as_ref().unwrap().id, "u1");

        let reselect = Engine::new(LifecyclePolicy {
            vetoed_proposer: VetoedProposerPolicy::RequireReselection,
            ..Default::default()
        });
        let mut state = state_with_selector("u1");
        reselect.propose_book(&mut state, draft("Dune"), "u1").unwrap();
        reselect.vote_on_book(&mut state, &club, "u2", Vote::Veto).unwrap();
        assert!(state.next_selector.is_none());
    }

    #[test]
    fn solo_club_has_no_eligible_voters() {
        let engine = Engine::default();
        let club = members(&["u1"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        // the only member is the proposer, so any vote is a self-vote
        assert_eq!(
            engine.vote_on_book(&mut state, &club, "u1", Vote::Approve),
            Err(LifecycleError::Unauthorized)
        );
    }

    #[test]
    fn meetings_sort_by_date_then_time() {
        let engine = Engine::default();
        let club = members(&["u1", "u2"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();
        engine.vote_on_book(&mut state, &club, "u2", Vote::Approve).unwrap();

        let meeting = |date: &str, start: &str| Meeting {
            date: date.to_string(),
            start_time: start.to_string(),
            end_time: "21:00".to_string(),
            location: None,
            notes: None,
            target_page: 50,
        };
        engine
            .update_setup(
                &mut state,
                vec![
                    meeting("2026-09-15", "19:00"),
                    meeting("2026-09-01", "20:00"),
                    meeting("2026-09-01", "18:00"),
                ],
            )
            .unwrap();

        let dates: Vec<_> = state
            .current_book
            .as_ref()
            .unwrap()
            .meetings
            .iter()
            .map(|m| (m.date.as_str(), m.start_time.as_str()))
            .collect();
        assert_eq!(
            dates,
            vec![
                ("2026-09-01", "18:00"),
                ("2026-09-01", "20:00"),
                ("2026-09-15", "19:00"),
            ]
        );
    }

    #[test]
    fn update_setup_is_rejected_outside_setup() {
        let engine = Engine::default();
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert!(matches!(
            engine.update_setup(&mut state, vec![]),
            Err(LifecycleError::InvalidTransition(_))
        ));
    }

    #[test]
    fn reading_requires_at_least_one_meeting() {
        let engine = Engine::default();
        let club = members(&["u1", "u2"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();
        engine.vote_on_book(&mut state, &club, "u2", Vote::Approve).unwrap();

        assert_eq!(
            engine.start_reading(&mut state),
            Err(LifecycleError::NoMeetings)
        );
        assert_eq!(state.current_book.as_ref().unwrap().status, BookStatus::Setup);

        engine
            .update_setup(
                &mut state,
                vec![Meeting {
                    date: "2026-09-01".to_string(),
                    start_time: "19:00".to_string(),
                    end_time: "20:30".to_string(),
                    location: Some("library".to_string()),
                    notes: None,
                    target_page: 100,
                }],
            )
            .unwrap();
        engine.start_reading(&mut state).unwrap();

        let book = state.current_book.as_ref().unwrap();
        assert_eq!(book.status, BookStatus::Reading);
        assert!(!book.start_date.is_empty());
    }

    #[test]
    fn discussion_ops_require_reading_status() {
        let engine = Engine::default();
        let club = members(&["u1", "u2"]);
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert!(matches!(
            engine.add_discussion_topic(&mut state, "pacing"),
            Err(LifecycleError::InvalidTransition(_))
        ));
        assert!(matches!(
            engine.add_discussion(&mut state, &club, "u2", "thoughts?"),
            Err(LifecycleError::InvalidTransition(_))
        ));
        assert!(matches!(
            engine.update_reading_progress(&mut state, 10),
            Err(LifecycleError::InvalidTransition(_))
        ));
    }

    #[test]
    fn topics_append_and_selector_clears() {
        let engine = Engine::default();
        let mut state = reading_state();

        engine.add_discussion_topic(&mut state, "the ocean").unwrap();
        engine.add_discussion_topic(&mut state, "memory").unwrap();
        assert_eq!(state.current_book.as_ref().unwrap().discussion_topics.len(), 2);

        // only the selector (u1) may clear
        assert_eq!(
            engine.clear_discussion_topics(&mut state, "u2"),
            Err(LifecycleError::Unauthorized)
        );
        engine.clear_discussion_topics(&mut state, "u1").unwrap();
        assert!(state.current_book.as_ref().unwrap().discussion_topics.is_empty());
    }

    #[test]
    fn discussion_posts_carry_the_author() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = reading_state();

        engine.add_discussion(&mut state, &club, "u2", "loved chapter 3").unwrap();
        let posts = &state.current_book.as_ref().unwrap().discussions;
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].user_id, "u2");
        assert_eq!(posts[0].content, "loved chapter 3");
    }

    #[test]
    fn progress_updates_current_page() {
        let engine = Engine::default();
        let mut state = reading_state();
        engine.update_reading_progress(&mut state, 142).unwrap();
        assert_eq!(state.current_book.as_ref().unwrap().current_page, 142);
    }

    #[test]
    fn stop_reading_moves_the_book_to_history() {
        let engine = Engine::default();
        let mut state = reading_state();
        let id = state.current_book.as_ref().unwrap().id.clone();

        engine.stop_reading(&mut state).unwrap();

        assert!(state.current_book.is_none());
        assert_eq!(state.book_history.len(), 1);
        let done = &state.book_history[0];
        assert_eq!(done.id, id, "id survives the move");
        assert_eq!(done.status, BookStatus::Completed);
        assert!(!done.end_date.is_empty());
    }

    #[test]
    fn stop_reading_outside_reading_is_rejected() {
        let engine = Engine::default();
        let mut state = state_with_selector("u1");
        engine.propose_book(&mut state, draft("Dune"), "u1").unwrap();

        assert!(matches!(
            engine.stop_reading(&mut state),
            Err(LifecycleError::InvalidTransition(_))
        ));
        assert!(state.book_history.is_empty());
    }

    #[test]
    fn rating_is_idempotent_per_user() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = reading_state();
        let id = state.current_book.as_ref().unwrap().id.clone();

        engine.rate_book(&mut state, &club, &id, "u2", 3).unwrap();
        engine.rate_book(&mut state, &club, &id, "u2", 5).unwrap();

        let ratings = &state.current_book.as_ref().unwrap().ratings;
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings["u2"], 5, "last rating wins");
    }

    #[test]
    fn rating_reaches_history_entries() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = reading_state();
        let id = state.current_book.as_ref().unwrap().id.clone();
        engine.stop_reading(&mut state).unwrap();

        engine.rate_book(&mut state, &club, &id, "u3", 4).unwrap();
        assert_eq!(state.book_history[0].ratings["u3"], 4);
    }

    #[test]
    fn rating_bounds_and_unknowns_are_rejected() {
        let engine = Engine::default();
        let club = members(&["u1", "u2", "u3"]);
        let mut state = reading_state();
        let id = state.current_book.as_ref().unwrap().id.clone();

        assert_eq!(
            engine.rate_book(&mut state, &club, &id, "u2", 0),
            Err(LifecycleError::InvalidRating)
        );
        assert_eq!(
            engine.rate_book(&mut state, &club, &id, "u2", 6),
            Err(LifecycleError::InvalidRating)
        );
        assert!(matches!(
            engine.rate_book(&mut state, &club, "nope", "u2", 3),
            Err(LifecycleError::NotFound(_))
        ));
        assert!(matches!(
            engine.rate_book(&mut state, &club, &id, "stranger", 3),
            Err(LifecycleError::NotFound(_))
        ));
    }

    #[test]
    fn selector_rating_policy() {
        let club = members(&["u1", "u2", "u3"]);

        let default_engine = Engine::default();
        let mut state = reading_state();
        let id = state.current_book.as_ref().unwrap().id.clone();
        default_engine.rate_book(&mut state, &club, &id, "u1", 5).unwrap();

        let strict = Engine::new(LifecyclePolicy {
            rating_eligibility: RatingEligibility::ExcludeSelector,
            ..Default::default()
        });
        let mut state = reading_state();
        let id = state.current_book.as_ref().unwrap().id.clone();
        assert_eq!(
            strict.rate_book(&mut state, &club, &id, "u1", 5),
            Err(LifecycleError::Unauthorized)
        );
        strict.rate_book(&mut state, &club, &id, "u2", 4).unwrap();
    }
}
