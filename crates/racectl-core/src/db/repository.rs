//! Store access for races, runners, and results
//!
//! Repositories expose read/insert/update by primary and natural key; the
//! invariants around lifecycle transitions, idempotent upserts, and ranking
//! live in the reconciliation service on top of them.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::{AuthoritativeId, FinishResult, Race, RaceStatus, ResultView, Runner};

/// Trait for race storage operations
pub trait RaceRepository {
    /// Insert a new race in `pending` status
    fn insert(&self, name: &str, description: Option<&str>) -> Result<Race>;

    /// Get a race by ID
    fn get(&self, id: AuthoritativeId) -> Result<Option<Race>>;

    /// List races, newest first
    fn list(&self) -> Result<Vec<Race>>;

    /// Update name/description, keeping current values where `None`
    fn update_details(
        &self,
        id: AuthoritativeId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<usize>;

    /// Transition to `active` and stamp the start time
    fn set_started(&self, id: AuthoritativeId, start_time: i64) -> Result<usize>;

    /// Set the lifecycle status
    fn set_status(&self, id: AuthoritativeId, status: RaceStatus) -> Result<usize>;
}

/// Trait for runner storage operations
pub trait RunnerRepository {
    /// Insert a runner; the store enforces bib uniqueness per race
    fn insert(
        &self,
        race_id: AuthoritativeId,
        bib_number: i64,
        name: Option<&str>,
    ) -> Result<Runner>;

    /// Get a runner by ID
    fn get(&self, id: AuthoritativeId) -> Result<Option<Runner>>;

    /// Natural-key lookup: (race, bib)
    fn by_bib(&self, race_id: AuthoritativeId, bib_number: i64) -> Result<Option<Runner>>;

    /// List runners for a race in bib order
    fn list_for_race(&self, race_id: AuthoritativeId) -> Result<Vec<Runner>>;
}

/// Trait for finish result storage operations
pub trait ResultRepository {
    /// Insert a finish row
    fn insert(
        &self,
        race_id: AuthoritativeId,
        runner_id: AuthoritativeId,
        finish_time: i64,
        device_id: Option<&str>,
    ) -> Result<FinishResult>;

    /// Get a result by ID
    fn get(&self, id: AuthoritativeId) -> Result<Option<FinishResult>>;

    /// Natural-key lookup: (race, runner)
    fn by_runner(
        &self,
        race_id: AuthoritativeId,
        runner_id: AuthoritativeId,
    ) -> Result<Option<FinishResult>>;

    /// Overwrite the finish time and recording device of an existing row
    fn update_finish(
        &self,
        id: AuthoritativeId,
        finish_time: i64,
        device_id: Option<&str>,
    ) -> Result<usize>;

    /// All results for a race in insertion order (row ids are assigned in
    /// insertion order, which is the tie-break the ranking pass relies on)
    fn list_in_insertion_order(&self, race_id: AuthoritativeId) -> Result<Vec<FinishResult>>;

    /// Persist a recomputed position
    fn set_position(&self, id: AuthoritativeId, position: i64) -> Result<usize>;

    /// Results joined with runner bib/name, position order
    fn list_views(&self, race_id: AuthoritativeId) -> Result<Vec<ResultView>>;
}

/// `SQLite` implementation of the race repository
pub struct SqliteRaceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRaceRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_race(row: &rusqlite::Row<'_>) -> rusqlite::Result<Race> {
        let status: String = row.get(3)?;
        Ok(Race {
            id: AuthoritativeId(row.get(0)?),
            name: row.get(1)?,
            description: row.get(2)?,
            status: status.parse().unwrap_or(RaceStatus::Pending),
            start_time: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

impl RaceRepository for SqliteRaceRepository<'_> {
    fn insert(&self, name: &str, description: Option<&str>) -> Result<Race> {
        let created_at = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO races (name, description, status, created_at) VALUES (?, ?, 'pending', ?)",
            params![name, description, created_at],
        )?;
        let id = AuthoritativeId(self.conn.last_insert_rowid());

        Ok(Race {
            id,
            name: name.to_string(),
            description: description.map(ToString::to_string),
            status: RaceStatus::Pending,
            start_time: None,
            created_at,
        })
    }

    fn get(&self, id: AuthoritativeId) -> Result<Option<Race>> {
        let race = self
            .conn
            .query_row(
                "SELECT id, name, description, status, start_time, created_at
                 FROM races WHERE id = ?",
                params![id.0],
                Self::parse_race,
            )
            .optional()?;
        Ok(race)
    }

    fn list(&self) -> Result<Vec<Race>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, status, start_time, created_at
             FROM races ORDER BY created_at DESC, id DESC",
        )?;
        let races = stmt
            .query_map([], Self::parse_race)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(races)
    }

    fn update_details(
        &self,
        id: AuthoritativeId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE races SET name = COALESCE(?, name), description = COALESCE(?, description)
             WHERE id = ?",
            params![name, description, id.0],
        )?;
        Ok(rows)
    }

    fn set_started(&self, id: AuthoritativeId, start_time: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE races SET status = 'active', start_time = ? WHERE id = ? AND status = 'pending'",
            params![start_time, id.0],
        )?;
        Ok(rows)
    }

    fn set_status(&self, id: AuthoritativeId, status: RaceStatus) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE races SET status = ? WHERE id = ?",
            params![status.to_string(), id.0],
        )?;
        Ok(rows)
    }
}

/// `SQLite` implementation of the runner repository
pub struct SqliteRunnerRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRunnerRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_runner(row: &rusqlite::Row<'_>) -> rusqlite::Result<Runner> {
        Ok(Runner {
            id: AuthoritativeId(row.get(0)?).into(),
            race_id: AuthoritativeId(row.get(1)?),
            bib_number: row.get(2)?,
            name: row.get(3)?,
            local_only: false,
        })
    }
}

impl RunnerRepository for SqliteRunnerRepository<'_> {
    fn insert(
        &self,
        race_id: AuthoritativeId,
        bib_number: i64,
        name: Option<&str>,
    ) -> Result<Runner> {
        self.conn.execute(
            "INSERT INTO runners (race_id, bib_number, name) VALUES (?, ?, ?)",
            params![race_id.0, bib_number, name],
        )?;
        let id = AuthoritativeId(self.conn.last_insert_rowid());

        Ok(Runner {
            id: id.into(),
            race_id,
            bib_number,
            name: name.map(ToString::to_string),
            local_only: false,
        })
    }

    fn get(&self, id: AuthoritativeId) -> Result<Option<Runner>> {
        let runner = self
            .conn
            .query_row(
                "SELECT id, race_id, bib_number, name FROM runners WHERE id = ?",
                params![id.0],
                Self::parse_runner,
            )
            .optional()?;
        Ok(runner)
    }

    fn by_bib(&self, race_id: AuthoritativeId, bib_number: i64) -> Result<Option<Runner>> {
        let runner = self
            .conn
            .query_row(
                "SELECT id, race_id, bib_number, name FROM runners
                 WHERE race_id = ? AND bib_number = ?",
                params![race_id.0, bib_number],
                Self::parse_runner,
            )
            .optional()?;
        Ok(runner)
    }

    fn list_for_race(&self, race_id: AuthoritativeId) -> Result<Vec<Runner>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, race_id, bib_number, name FROM runners
             WHERE race_id = ? ORDER BY bib_number",
        )?;
        let runners = stmt
            .query_map(params![race_id.0], Self::parse_runner)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(runners)
    }
}

/// `SQLite` implementation of the result repository
pub struct SqliteResultRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteResultRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<FinishResult> {
        Ok(FinishResult {
            id: AuthoritativeId(row.get(0)?).into(),
            race_id: AuthoritativeId(row.get(1)?),
            runner_id: AuthoritativeId(row.get(2)?).into(),
            finish_time: row.get(3)?,
            chip_time: row.get(4)?,
            position: row.get(5)?,
            device_id: row.get(6)?,
            local_only: false,
        })
    }
}

const RESULT_COLUMNS: &str = "id, race_id, runner_id, finish_time, chip_time, position, device_id";

impl ResultRepository for SqliteResultRepository<'_> {
    fn insert(
        &self,
        race_id: AuthoritativeId,
        runner_id: AuthoritativeId,
        finish_time: i64,
        device_id: Option<&str>,
    ) -> Result<FinishResult> {
        let created_at = chrono::Utc::now().timestamp();
        self.conn.execute(
            "INSERT INTO race_results (race_id, runner_id, finish_time, device_id, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![race_id.0, runner_id.0, finish_time, device_id, created_at],
        )?;
        let id = AuthoritativeId(self.conn.last_insert_rowid());

        Ok(FinishResult {
            id: id.into(),
            race_id,
            runner_id: runner_id.into(),
            finish_time,
            chip_time: None,
            position: None,
            device_id: device_id.map(ToString::to_string),
            local_only: false,
        })
    }

    fn get(&self, id: AuthoritativeId) -> Result<Option<FinishResult>> {
        let result = self
            .conn
            .query_row(
                &format!("SELECT {RESULT_COLUMNS} FROM race_results WHERE id = ?"),
                params![id.0],
                Self::parse_result,
            )
            .optional()?;
        Ok(result)
    }

    fn by_runner(
        &self,
        race_id: AuthoritativeId,
        runner_id: AuthoritativeId,
    ) -> Result<Option<FinishResult>> {
        let result = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RESULT_COLUMNS} FROM race_results
                     WHERE race_id = ? AND runner_id = ?"
                ),
                params![race_id.0, runner_id.0],
                Self::parse_result,
            )
            .optional()?;
        Ok(result)
    }

    fn update_finish(
        &self,
        id: AuthoritativeId,
        finish_time: i64,
        device_id: Option<&str>,
    ) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE race_results SET finish_time = ?, device_id = ? WHERE id = ?",
            params![finish_time, device_id, id.0],
        )?;
        Ok(rows)
    }

    fn list_in_insertion_order(&self, race_id: AuthoritativeId) -> Result<Vec<FinishResult>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RESULT_COLUMNS} FROM race_results WHERE race_id = ? ORDER BY id"
        ))?;
        let results = stmt
            .query_map(params![race_id.0], Self::parse_result)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(results)
    }

    fn set_position(&self, id: AuthoritativeId, position: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "UPDATE race_results SET position = ? WHERE id = ?",
            params![position, id.0],
        )?;
        Ok(rows)
    }

    fn list_views(&self, race_id: AuthoritativeId) -> Result<Vec<ResultView>> {
        let mut stmt = self.conn.prepare(
            "SELECT rr.id, rr.race_id, rr.runner_id, rr.finish_time, rr.chip_time,
                    rr.position, rr.device_id, r.bib_number, r.name, rc.start_time
             FROM race_results rr
             JOIN runners r ON rr.runner_id = r.id
             JOIN races rc ON rr.race_id = rc.id
             WHERE rr.race_id = ?
             ORDER BY rr.position IS NULL, rr.position, rr.finish_time",
        )?;
        let views = stmt
            .query_map(params![race_id.0], |row| {
                let finish_time: i64 = row.get(3)?;
                let start_time: Option<i64> = row.get(9)?;
                Ok(ResultView {
                    id: AuthoritativeId(row.get(0)?),
                    race_id: AuthoritativeId(row.get(1)?),
                    runner_id: AuthoritativeId(row.get(2)?),
                    finish_time,
                    chip_time: row.get(4)?,
                    position: row.get(5)?,
                    device_id: row.get(6)?,
                    bib_number: row.get(7)?,
                    runner_name: row.get(8)?,
                    elapsed_time: start_time.map(|start| finish_time - start),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_race_insert_and_get() {
        let db = setup();
        let races = SqliteRaceRepository::new(db.connection());

        let race = races.insert("Pub-to-Pub 2025", Some("Winter race")).unwrap();
        assert_eq!(race.status, RaceStatus::Pending);
        assert_eq!(race.start_time, None);

        let fetched = races.get(race.id).unwrap().unwrap();
        assert_eq!(fetched, race);
        assert!(races.get(AuthoritativeId(999)).unwrap().is_none());
    }

    #[test]
    fn test_race_start_transition_is_guarded() {
        let db = setup();
        let races = SqliteRaceRepository::new(db.connection());

        let race = races.insert("Guarded", None).unwrap();
        assert_eq!(races.set_started(race.id, 1_000).unwrap(), 1);

        // A second start must not restamp the start time
        assert_eq!(races.set_started(race.id, 2_000).unwrap(), 0);
        let fetched = races.get(race.id).unwrap().unwrap();
        assert_eq!(fetched.start_time, Some(1_000));
        assert_eq!(fetched.status, RaceStatus::Active);
    }

    #[test]
    fn test_runner_natural_key_lookup() {
        let db = setup();
        let races = SqliteRaceRepository::new(db.connection());
        let runners = SqliteRunnerRepository::new(db.connection());

        let race = races.insert("Lookup", None).unwrap();
        let runner = runners.insert(race.id, 7, Some("Ada")).unwrap();

        let by_bib = runners.by_bib(race.id, 7).unwrap().unwrap();
        assert_eq!(by_bib, runner);
        assert!(runners.by_bib(race.id, 8).unwrap().is_none());
    }

    #[test]
    fn test_result_upsert_building_blocks() {
        let db = setup();
        let races = SqliteRaceRepository::new(db.connection());
        let runners = SqliteRunnerRepository::new(db.connection());
        let results = SqliteResultRepository::new(db.connection());

        let race = races.insert("Finishes", None).unwrap();
        let runner = runners.insert(race.id, 7, None).unwrap();
        let runner_id = runner.id.authoritative().unwrap();

        let result = results.insert(race.id, runner_id, 1_125, Some("dev-a")).unwrap();
        let found = results.by_runner(race.id, runner_id).unwrap().unwrap();
        assert_eq!(found, result);

        let result_id = result.id.authoritative().unwrap();
        assert_eq!(results.update_finish(result_id, 1_080, Some("dev-b")).unwrap(), 1);
        let updated = results.by_runner(race.id, runner_id).unwrap().unwrap();
        assert_eq!(updated.finish_time, 1_080);
        assert_eq!(updated.device_id.as_deref(), Some("dev-b"));
    }

    #[test]
    fn test_result_views_join_runner_fields() {
        let db = setup();
        let races = SqliteRaceRepository::new(db.connection());
        let runners = SqliteRunnerRepository::new(db.connection());
        let results = SqliteResultRepository::new(db.connection());

        let race = races.insert("Join", None).unwrap();
        races.set_started(race.id, 1_000).unwrap();
        let runner = runners.insert(race.id, 7, Some("Ada")).unwrap();
        results
            .insert(race.id, runner.id.authoritative().unwrap(), 1_125, None)
            .unwrap();

        let views = results.list_views(race.id).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].bib_number, 7);
        assert_eq!(views[0].runner_name.as_deref(), Some("Ada"));
        assert_eq!(views[0].elapsed_time, Some(125));
    }
}
