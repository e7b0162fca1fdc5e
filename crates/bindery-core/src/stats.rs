use chrono::{DateTime, Utc};
use serde::Serialize;

use bindery_types::models::{Book, BookStatus, Member};

/// Derived, read-only club statistics. Pure function of the state document
/// and the member list; every division is guarded to 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubStats {
    pub total_books: usize,
    /// Mean of per-book mean ratings; unrated books count as 0.
    pub average_rating: f64,
    pub total_pages: u64,
    pub completed_pages: u64,
    pub average_book_length: u64,
    pub days_since_start: i64,
    /// Books per 30-day window since the first start date.
    pub books_per_month: f64,
    pub pages_per_month: u64,
    pub total_discussions: usize,
    pub average_discussions_per_book: f64,
    pub highest_rated_book: Option<HighestRatedBook>,
    pub member_stats: Vec<MemberStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighestRatedBook {
    pub title: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStats {
    pub id: String,
    pub name: String,
    pub email: String,
    pub books_selected: usize,
    /// Mean rating received across this member's picks.
    pub average_book_rating: f64,
    /// Mean rating this member has given.
    pub average_given_rating: f64,
}

pub fn compute(
    current: Option<&Book>,
    history: &[Book],
    members: &[Member],
    now: DateTime<Utc>,
) -> ClubStats {
    let all_books: Vec<&Book> = current.into_iter().chain(history.iter()).collect();

    let total_books = all_books.len();
    let average_rating = if total_books == 0 {
        0.0
    } else {
        all_books.iter().copied().map(mean_rating).sum::<f64>() / total_books as f64
    };

    let total_pages: u64 = all_books.iter().map(|b| u64::from(b.page_count)).sum();
    let completed_pages: u64 = all_books
        .iter()
        .filter(|b| b.status == BookStatus::Completed)
        .map(|b| u64::from(b.page_count))
        .sum();
    let average_book_length = if total_books == 0 {
        0
    } else {
        (total_pages as f64 / total_books as f64).round() as u64
    };

    let first_start = all_books
        .iter()
        .filter_map(|b| DateTime::parse_from_rfc3339(&b.start_date).ok())
        .map(|d| d.with_timezone(&Utc))
        .min();
    let days_since_start = first_start
        .map(|first| ((now - first).num_seconds() as f64 / 86_400.0).round() as i64)
        .unwrap_or(0);

    let (books_per_month, pages_per_month) = if days_since_start > 0 {
        (
            round1(total_books as f64 * 30.0 / days_since_start as f64),
            (completed_pages as f64 * 30.0 / days_since_start as f64).round() as u64,
        )
    } else {
        (0.0, 0)
    };

    let total_discussions: usize = all_books.iter().map(|b| b.discussions.len()).sum();
    let average_discussions_per_book = if total_books == 0 {
        0.0
    } else {
        round1(total_discussions as f64 / total_books as f64)
    };

    let highest_rated_book = all_books
        .iter()
        .copied()
        .map(|b| (b, mean_rating(b)))
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(b, rating)| HighestRatedBook {
            title: b.title.clone(),
            rating: round1(rating),
        });

    let member_stats = members
        .iter()
        .map(|member| {
            let picks: Vec<&Book> = all_books
                .iter()
                .filter(|b| b.selected_by == member.id)
                .copied()
                .collect();
            let average_book_rating = if picks.is_empty() {
                0.0
            } else {
                round1(picks.iter().copied().map(mean_rating).sum::<f64>() / picks.len() as f64)
            };

            let given: Vec<f64> = all_books
                .iter()
                .filter_map(|b| b.ratings.get(&member.id))
                .map(|r| f64::from(*r))
                .collect();
            let average_given_rating = if given.is_empty() {
                0.0
            } else {
                round1(given.iter().sum::<f64>() / given.len() as f64)
            };

            MemberStats {
                id: member.id.clone(),
                name: member.name.clone(),
                email: member.email.clone(),
                books_selected: picks.len(),
                average_book_rating,
                average_given_rating,
            }
        })
        .collect();

    ClubStats {
        total_books,
        average_rating,
        total_pages,
        completed_pages,
        average_book_length,
        days_since_start,
        books_per_month,
        pages_per_month,
        total_discussions,
        average_discussions_per_book,
        highest_rated_book,
        member_stats,
    }
}

/// Mean of a book's ratings; 0 when nobody has rated it yet.
fn mean_rating(book: &Book) -> f64 {
    if book.ratings.is_empty() {
        return 0.0;
    }
    book.ratings.values().map(|r| f64::from(*r)).sum::<f64>() / book.ratings.len() as f64
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}
