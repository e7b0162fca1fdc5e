use anyhow::{Result, anyhow};
use rusqlite::Connection;

use bindery_types::models::{BookClub, BookClubState, StatePatch, User};

use crate::Database;

impl Database {
    // -- users --

    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.with_conn(|conn| {
            let doc = serde_json::to_string(user)?;
            conn.execute(
                "INSERT INTO users (id, email, doc) VALUES (?1, ?2, ?3)",
                rusqlite::params![user.id, user.email, doc],
            )?;
            Ok(())
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "SELECT doc FROM users WHERE email = ?1", email))
    }

    pub fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "SELECT doc FROM users WHERE id = ?1", id))
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT doc FROM users")?;
            let docs = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            docs.iter()
                .map(|doc| serde_json::from_str(doc).map_err(Into::into))
                .collect()
        })
    }

    // -- book clubs --

    pub fn insert_club(&self, club: &BookClub) -> Result<()> {
        self.with_conn(|conn| {
            let doc = serde_json::to_string(club)?;
            conn.execute(
                "INSERT INTO bookclubs (id, invite_code, doc) VALUES (?1, ?2, ?3)",
                rusqlite::params![club.id, club.invite_code, doc],
            )?;
            Ok(())
        })
    }

    pub fn find_club_by_id(&self, id: &str) -> Result<Option<BookClub>> {
        self.with_conn(|conn| query_club(conn, "SELECT doc FROM bookclubs WHERE id = ?1", id))
    }

    pub fn find_club_by_invite_code(&self, code: &str) -> Result<Option<BookClub>> {
        self.with_conn(|conn| {
            query_club(conn, "SELECT doc FROM bookclubs WHERE invite_code = ?1", code)
        })
    }

    /// Clubs whose member list contains `user_id`. The collection is small
    /// enough to filter after deserializing.
    pub fn list_clubs_for_user(&self, user_id: &str) -> Result<Vec<BookClub>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT doc FROM bookclubs")?;
            let docs = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;

            let mut clubs = Vec::new();
            for doc in &docs {
                let club: BookClub = serde_json::from_str(doc)?;
                if club.members.iter().any(|m| m == user_id) {
                    clubs.push(club);
                }
            }
            Ok(clubs)
        })
    }

    /// Whole-document replace. The caller is expected to have fetched the
    /// club first; an unknown id is an error here, not a silent no-op.
    pub fn update_club(&self, club: &BookClub) -> Result<()> {
        self.with_conn(|conn| {
            let doc = serde_json::to_string(club)?;
            let changed = conn.execute(
                "UPDATE bookclubs SET invite_code = ?2, doc = ?3 WHERE id = ?1",
                rusqlite::params![club.id, club.invite_code, doc],
            )?;
            if changed == 0 {
                return Err(anyhow!("Book club not found: {}", club.id));
            }
            Ok(())
        })
    }

    // -- book club states --

    /// Fetch the state document for a club, inserting the empty default if
    /// none exists yet.
    pub fn load_state(&self, club_id: &str) -> Result<BookClubState> {
        self.with_conn(|conn| {
            if let Some(state) = query_state(conn, club_id)? {
                return Ok(state);
            }

            let default = BookClubState::empty(club_id);
            let doc = serde_json::to_string(&default)?;
            // OR IGNORE: a racing writer's default resolves to the same row
            conn.execute(
                "INSERT OR IGNORE INTO bookclub_states (book_club_id, doc) VALUES (?1, ?2)",
                rusqlite::params![club_id, doc],
            )?;

            query_state(conn, club_id)?
                .ok_or_else(|| anyhow!("State missing after insert: {}", club_id))
        })
    }

    /// Field-level override-if-present merge: each top-level field supplied
    /// in `patch` replaces the stored field wholesale, the rest keep the
    /// value fetched immediately before the write. Upserts, then returns the
    /// post-write document.
    pub fn save_state(&self, club_id: &str, patch: &StatePatch) -> Result<BookClubState> {
        self.with_conn(|conn| {
            let mut state =
                query_state(conn, club_id)?.unwrap_or_else(|| BookClubState::empty(club_id));
            state.book_club_id = club_id.to_string();

            if let Some(current_book) = &patch.current_book {
                state.current_book = current_book.clone();
            }
            if let Some(book_history) = &patch.book_history {
                state.book_history = book_history.clone();
            }
            if let Some(next_selector) = &patch.next_selector {
                state.next_selector = next_selector.clone();
            }

            let doc = serde_json::to_string(&state)?;
            conn.execute(
                "INSERT INTO bookclub_states (book_club_id, doc) VALUES (?1, ?2)
                 ON CONFLICT(book_club_id) DO UPDATE SET doc = excluded.doc",
                rusqlite::params![club_id, doc],
            )?;

            query_state(conn, club_id)?
                .ok_or_else(|| anyhow!("State missing after upsert: {}", club_id))
        })
    }
}

fn query_user(conn: &Connection, sql: &str, key: &str) -> Result<Option<User>> {
    let doc = conn
        .query_row(sql, [key], |row| row.get::<_, String>(0))
        .optional()?;

    match doc {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}

fn query_club(conn: &Connection, sql: &str, key: &str) -> Result<Option<BookClub>> {
    let doc = conn
        .query_row(sql, [key], |row| row.get::<_, String>(0))
        .optional()?;

    match doc {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}

fn query_state(conn: &Connection, club_id: &str) -> Result<Option<BookClubState>> {
    let doc = conn
        .query_row(
            "SELECT doc FROM bookclub_states WHERE book_club_id = ?1",
            [club_id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;

    match doc {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
