//! Database migrations

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|flag| flag != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: Initial schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );
        CREATE TABLE IF NOT EXISTS races (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            start_time INTEGER,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS runners (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id INTEGER NOT NULL REFERENCES races(id) ON DELETE CASCADE,
            bib_number INTEGER NOT NULL,
            name TEXT,
            UNIQUE(race_id, bib_number)
        );
        CREATE INDEX IF NOT EXISTS idx_runners_race ON runners(race_id);
        CREATE TABLE IF NOT EXISTS race_results (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            race_id INTEGER NOT NULL REFERENCES races(id) ON DELETE CASCADE,
            runner_id INTEGER NOT NULL REFERENCES runners(id) ON DELETE CASCADE,
            finish_time INTEGER NOT NULL,
            chip_time INTEGER,
            position INTEGER,
            device_id TEXT,
            created_at INTEGER NOT NULL,
            UNIQUE(race_id, runner_id)
        );
        CREATE INDEX IF NOT EXISTS idx_race_results_race ON race_results(race_id);
        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )?;

    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_migrations() {
        let conn = setup();
        run(&conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let conn = setup();
        run(&conn).unwrap();
        run(&conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_bib_unique_within_race() {
        let conn = setup();
        run(&conn).unwrap();

        conn.execute(
            "INSERT INTO races (name, status, created_at) VALUES ('A', 'pending', 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO runners (race_id, bib_number) VALUES (1, 7)",
            [],
        )
        .unwrap();

        let duplicate = conn.execute(
            "INSERT INTO runners (race_id, bib_number) VALUES (1, 7)",
            [],
        );
        assert!(duplicate.is_err());
    }
}
