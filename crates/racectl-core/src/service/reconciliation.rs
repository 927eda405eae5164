//! Reconciliation service: the authoritative side of sync
//!
//! Every handler is idempotent with respect to its natural key and runs in
//! a single transaction scoped to the target race, so replayed or
//! out-of-order operations from offline devices never create duplicates.

use rusqlite::Connection;

use crate::db::{
    RaceRepository, ResultRepository, RunnerRepository, SqliteRaceRepository,
    SqliteResultRepository, SqliteRunnerRepository,
};
use crate::error::{Error, Result};
use crate::models::{
    AddRunnerRequest, AddRunnersBulkRequest, AuthoritativeId, BulkFinishesResponse,
    BulkRunnersResponse, FinishRequest, FinishResult, FinishRow, Race, RaceStatus,
    RecordFinishesBulkRequest, ResultView, RowError, Runner, UpdateRaceRequest,
};

use super::ranking::assign_positions;

/// Authoritative operation handlers over a single store connection.
///
/// The connection is the unit of serialization: concurrent devices are
/// serialized by the caller (one connection behind a lock), so an
/// upsert-then-rerank sequence can never interleave with another one for
/// the same race.
pub struct ReconciliationService<'a> {
    conn: &'a Connection,
}

impl<'a> ReconciliationService<'a> {
    /// Create a service over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a race in `pending` status
    pub fn create_race(&self, name: &str, description: Option<&str>) -> Result<Race> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Invalid("Race name is required".into()));
        }
        let race = SqliteRaceRepository::new(self.conn).insert(name, description)?;
        tracing::info!(race = race.id.0, "Created race {name:?}");
        Ok(race)
    }

    /// Fetch a race or fail with `NotFound`
    pub fn get_race(&self, id: AuthoritativeId) -> Result<Race> {
        SqliteRaceRepository::new(self.conn)
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))
    }

    /// List races, newest first
    pub fn list_races(&self) -> Result<Vec<Race>> {
        SqliteRaceRepository::new(self.conn).list()
    }

    /// Edit race name/description
    pub fn update_race(&self, id: AuthoritativeId, req: &UpdateRaceRequest) -> Result<Race> {
        let tx = self.conn.unchecked_transaction()?;
        let races = SqliteRaceRepository::new(self.conn);
        races
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))?;
        races.update_details(id, req.name.as_deref(), req.description.as_deref())?;
        let race = races
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))?;
        tx.commit()?;
        Ok(race)
    }

    /// Transition pending -> active, stamping the start time exactly once
    pub fn start_race(&self, id: AuthoritativeId, start_time: Option<i64>) -> Result<Race> {
        let tx = self.conn.unchecked_transaction()?;
        let races = SqliteRaceRepository::new(self.conn);
        let race = races
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))?;
        if race.status != RaceStatus::Pending {
            return Err(Error::Conflict("Race has already been started".into()));
        }

        let start_time = start_time.unwrap_or_else(|| chrono::Utc::now().timestamp());
        races.set_started(id, start_time)?;
        let race = races
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))?;
        tx.commit()?;
        tracing::info!(race = id.0, start_time, "Race started");
        Ok(race)
    }

    /// Transition active -> completed
    pub fn end_race(&self, id: AuthoritativeId) -> Result<Race> {
        let tx = self.conn.unchecked_transaction()?;
        let races = SqliteRaceRepository::new(self.conn);
        let race = races
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))?;
        if race.status != RaceStatus::Active {
            return Err(Error::Conflict("Race is not active".into()));
        }

        races.set_status(id, RaceStatus::Completed)?;
        let race = races
            .get(id)?
            .ok_or_else(|| Error::NotFound(format!("Race {id} not found")))?;
        tx.commit()?;
        tracing::info!(race = id.0, "Race ended");
        Ok(race)
    }

    /// Create-or-conflict by (race, bib). Returns the authoritative runner
    /// including its generated identifier.
    pub fn add_runner(&self, req: &AddRunnerRequest) -> Result<Runner> {
        let tx = self.conn.unchecked_transaction()?;
        let runner = self.insert_runner(req.race_id, Some(req.bib_number), req.name.as_deref())?;
        tx.commit()?;
        tracing::debug!(
            race = req.race_id.0,
            bib = req.bib_number,
            "Registered runner"
        );
        Ok(runner)
    }

    /// Per-row create-or-error; one invalid row never aborts the batch
    pub fn add_runners_bulk(&self, req: &AddRunnersBulkRequest) -> Result<BulkRunnersResponse> {
        let tx = self.conn.unchecked_transaction()?;
        // The race check fails the whole request; everything after is per-row
        self.get_race(req.race_id)?;

        let mut added = Vec::new();
        let mut errors = Vec::new();
        for row in &req.runners {
            match self.insert_runner(req.race_id, row.bib_number, row.name.as_deref()) {
                Ok(runner) => added.push(runner),
                Err(err) => errors.push(RowError {
                    row: row.clone(),
                    error: err.to_string(),
                }),
            }
        }
        tx.commit()?;

        tracing::debug!(
            race = req.race_id.0,
            added = added.len(),
            errors = errors.len(),
            "Bulk runner import"
        );
        Ok(BulkRunnersResponse { added, errors })
    }

    /// Upsert a finish by (race, runner) and rerank the race. Replaying the
    /// same payload, or correcting the time, both update the existing row.
    pub fn record_finish(&self, req: &FinishRequest) -> Result<FinishResult> {
        let tx = self.conn.unchecked_transaction()?;
        let race = self.get_race(req.race_id)?;
        if !race.status.accepts_finishes() {
            return Err(Error::Conflict("Race has not been started".into()));
        }

        let result = self.upsert_finish(
            req.race_id,
            req.runner_id,
            req.finish_time,
            req.device_id.as_deref(),
        )?;
        self.rerank(req.race_id)?;

        // Re-read so the returned row carries its recomputed position
        let results = SqliteResultRepository::new(self.conn);
        let result = results
            .by_runner(req.race_id, req.runner_id)?
            .unwrap_or(result);
        tx.commit()?;

        tracing::debug!(
            race = req.race_id.0,
            runner = req.runner_id.0,
            finish_time = req.finish_time,
            "Recorded finish"
        );
        Ok(result)
    }

    /// Per-row upsert by runner id or bib; a single rerank after all rows
    pub fn record_finishes_bulk(
        &self,
        req: &RecordFinishesBulkRequest,
    ) -> Result<BulkFinishesResponse> {
        let tx = self.conn.unchecked_transaction()?;
        let race = self.get_race(req.race_id)?;
        if !race.status.accepts_finishes() {
            return Err(Error::Conflict("Race has not been started".into()));
        }

        let mut processed_ids = Vec::new();
        let mut errors = Vec::new();
        for row in &req.results {
            match self.apply_finish_row(req.race_id, row, req.device_id.as_deref()) {
                Ok(result) => {
                    if let Some(id) = result.id.authoritative() {
                        processed_ids.push(id);
                    }
                }
                Err(err) => errors.push(RowError {
                    row: row.clone(),
                    error: err.to_string(),
                }),
            }
        }

        // One rerank for the whole batch, then re-read the affected rows so
        // the response carries fresh positions
        self.rerank(req.race_id)?;
        let results = SqliteResultRepository::new(self.conn);
        let mut processed = Vec::with_capacity(processed_ids.len());
        for id in processed_ids {
            if let Some(result) = results.get(id)? {
                processed.push(result);
            }
        }
        tx.commit()?;

        tracing::debug!(
            race = req.race_id.0,
            processed = processed.len(),
            errors = errors.len(),
            "Bulk finish upload"
        );
        Ok(BulkFinishesResponse { processed, errors })
    }

    /// List runners for a race in bib order
    pub fn list_runners(&self, race_id: AuthoritativeId) -> Result<Vec<Runner>> {
        self.get_race(race_id)?;
        SqliteRunnerRepository::new(self.conn).list_for_race(race_id)
    }

    /// Natural-key runner lookup
    pub fn runner_by_bib(&self, race_id: AuthoritativeId, bib_number: i64) -> Result<Runner> {
        SqliteRunnerRepository::new(self.conn)
            .by_bib(race_id, bib_number)?
            .ok_or_else(|| Error::NotFound(format!("Runner with bib {bib_number} not found")))
    }

    /// Results joined with runner fields, position order
    pub fn list_results(&self, race_id: AuthoritativeId) -> Result<Vec<ResultView>> {
        self.get_race(race_id)?;
        SqliteResultRepository::new(self.conn).list_views(race_id)
    }

    fn insert_runner(
        &self,
        race_id: AuthoritativeId,
        bib_number: Option<i64>,
        name: Option<&str>,
    ) -> Result<Runner> {
        self.get_race(race_id)?;
        let bib_number = bib_number.ok_or_else(|| Error::Invalid("Bib number is required".into()))?;
        if bib_number <= 0 {
            return Err(Error::Invalid("Bib number must be positive".into()));
        }

        let runners = SqliteRunnerRepository::new(self.conn);
        if runners.by_bib(race_id, bib_number)?.is_some() {
            return Err(Error::Conflict(
                "Bib number already in use for this race".into(),
            ));
        }
        runners.insert(race_id, bib_number, name)
    }

    fn apply_finish_row(
        &self,
        race_id: AuthoritativeId,
        row: &FinishRow,
        device_id: Option<&str>,
    ) -> Result<FinishResult> {
        let runner_id = match (row.runner_id, row.bib_number) {
            (Some(id), _) => id,
            (None, Some(bib)) => self
                .runner_by_bib(race_id, bib)?
                .id
                .authoritative()
                .ok_or_else(|| Error::NotFound(format!("Runner with bib {bib} not found")))?,
            (None, None) => {
                return Err(Error::Invalid(
                    "Either runner ID or bib number is required".into(),
                ))
            }
        };
        self.upsert_finish(race_id, runner_id, row.finish_time, device_id)
    }

    fn upsert_finish(
        &self,
        race_id: AuthoritativeId,
        runner_id: AuthoritativeId,
        finish_time: i64,
        device_id: Option<&str>,
    ) -> Result<FinishResult> {
        let runners = SqliteRunnerRepository::new(self.conn);
        let runner = runners
            .get(runner_id)?
            .filter(|runner| runner.race_id == race_id)
            .ok_or_else(|| Error::NotFound("Runner not found or not in this race".into()))?;

        let results = SqliteResultRepository::new(self.conn);
        match results.by_runner(race_id, runner_id)? {
            Some(existing) => {
                let id = existing
                    .id
                    .authoritative()
                    .ok_or_else(|| Error::NotFound("Result row missing identifier".into()))?;
                results.update_finish(id, finish_time, device_id)?;
                results
                    .get(id)?
                    .ok_or_else(|| Error::NotFound(format!("Result {id} not found")))
            }
            None => {
                let result = results.insert(race_id, runner_id, finish_time, device_id)?;
                tracing::trace!(
                    race = race_id.0,
                    bib = runner.bib_number,
                    "Inserted finish row"
                );
                Ok(result)
            }
        }
    }

    /// Recompute every position for the race from the current finish-time set
    fn rerank(&self, race_id: AuthoritativeId) -> Result<()> {
        let results = SqliteResultRepository::new(self.conn);
        let mut rows = results.list_in_insertion_order(race_id)?;
        assign_positions(&mut rows, |r| r.finish_time, |r, p| r.position = Some(p));
        for row in &rows {
            if let (Some(id), Some(position)) = (row.id.authoritative(), row.position) {
                results.set_position(id, position)?;
            }
        }
        Ok(())
    }
}
