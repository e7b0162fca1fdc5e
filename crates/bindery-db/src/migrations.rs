use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Collections are JSON documents in a single `doc` column; the extra
/// columns are the natural keys each collection is looked up by.
pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id      TEXT PRIMARY KEY,
            email   TEXT NOT NULL UNIQUE,
            doc     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bookclubs (
            id          TEXT PRIMARY KEY,
            invite_code TEXT NOT NULL UNIQUE,
            doc         TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bookclub_states (
            book_club_id TEXT PRIMARY KEY,
            doc          TEXT NOT NULL
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
