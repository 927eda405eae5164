//! Client session
//!
//! Explicit context object owning the device's durable store: the mutation
//! queue, the per-race caches, and the device identity. Components receive
//! a session instead of reaching for process-wide state, so the whole
//! client engine can be exercised against an in-memory store.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{
    AddRunnerRequest, AddRunnersBulkRequest, AuthoritativeId, FinishResult, Operation, QueueItem,
    Race, RecordFinishItem, RecordFinishesBulkRequest, Runner, RunnerRow,
};
use crate::service::assign_positions;
use crate::storage::KvStore;

use super::cache::{result_cache, runner_cache, RecordCache};
use super::queue::SyncQueue;
use super::reconcile::{reconcile, Reconciled};

const RACES_KEY: &str = "races";

/// Device-local state: queue, caches, device identity
pub struct Session<S> {
    store: Arc<S>,
    device_id: String,
}

impl<S> Clone for Session<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            device_id: self.device_id.clone(),
        }
    }
}

impl<S: KvStore> Session<S> {
    /// Create a session over the given store
    pub fn new(store: Arc<S>, device_id: impl Into<String>) -> Self {
        Self {
            store,
            device_id: device_id.into(),
        }
    }

    /// The identifier this device stamps onto finish recordings
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// The mutation queue backed by this session's store
    #[must_use]
    pub fn queue(&self) -> SyncQueue<S> {
        SyncQueue::new(Arc::clone(&self.store))
    }

    /// The runner cache backed by this session's store
    #[must_use]
    pub fn runners(&self) -> RecordCache<S, Runner> {
        runner_cache(Arc::clone(&self.store))
    }

    /// The result cache backed by this session's store
    #[must_use]
    pub fn results(&self) -> RecordCache<S, FinishResult> {
        result_cache(Arc::clone(&self.store))
    }

    /// Number of queued-but-unsynced mutations; always surfaced to the user
    pub fn pending_count(&self) -> Result<usize> {
        self.queue().pending_count()
    }

    /// Cache the race list for offline reads
    pub fn cache_races(&self, races: &[Race]) -> Result<()> {
        self.store.set(RACES_KEY, &serde_json::to_string(races)?)
    }

    /// Cached race list (empty when never cached)
    pub fn cached_races(&self) -> Result<Vec<Race>> {
        match self.store.get(RACES_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Cached race by id
    pub fn cached_race(&self, race_id: AuthoritativeId) -> Result<Option<Race>> {
        Ok(self
            .cached_races()?
            .into_iter()
            .find(|race| race.id == race_id))
    }

    /// Register a runner locally and queue the mutation for replay.
    ///
    /// The bib is checked against the cache so the common duplicate is
    /// caught immediately; the store re-checks on sync either way.
    pub fn add_runner_local(
        &self,
        race_id: AuthoritativeId,
        bib_number: i64,
        name: Option<String>,
    ) -> Result<Runner> {
        let cache = self.runners();
        let mut runners = cache.load(race_id)?;
        if runners.iter().any(|runner| runner.bib_number == bib_number) {
            return Err(Error::Conflict(
                "Bib number already in use for this race".into(),
            ));
        }

        let runner = Runner::provisional(race_id, bib_number, name.clone());
        runners.push(runner.clone());
        cache.save(race_id, &runners)?;

        self.queue().enqueue(QueueItem::new(Operation::AddRunner(
            AddRunnerRequest {
                race_id,
                bib_number,
                name,
            },
        )))?;
        tracing::debug!(race = race_id.0, bib = bib_number, "Queued runner add");
        Ok(runner)
    }

    /// Register a batch of runners locally and queue one bulk mutation
    pub fn import_runners_local(
        &self,
        race_id: AuthoritativeId,
        rows: Vec<RunnerRow>,
    ) -> Result<Vec<Runner>> {
        let cache = self.runners();
        let mut runners = cache.load(race_id)?;
        let mut imported = Vec::new();
        for row in &rows {
            let Some(bib_number) = row.bib_number else {
                continue; // surfaced as a per-row error at sync time
            };
            if runners.iter().any(|runner| runner.bib_number == bib_number) {
                continue;
            }
            let runner = Runner::provisional(race_id, bib_number, row.name.clone());
            runners.push(runner.clone());
            imported.push(runner);
        }
        cache.save(race_id, &runners)?;

        self.queue()
            .enqueue(QueueItem::new(Operation::AddRunnersBulk(
                AddRunnersBulkRequest {
                    race_id,
                    runners: rows,
                },
            )))?;
        tracing::debug!(
            race = race_id.0,
            imported = imported.len(),
            "Queued bulk runner import"
        );
        Ok(imported)
    }

    /// Record a finish locally by bib and queue the mutation for replay.
    ///
    /// A second recording for the same runner updates the cached result in
    /// place, mirroring the authoritative upsert; local positions are
    /// recomputed so the device shows a live ranking while offline.
    pub fn record_finish_local(
        &self,
        race_id: AuthoritativeId,
        bib_number: i64,
        finish_time: i64,
    ) -> Result<FinishResult> {
        let recorded = self.record_finish_cache_only(race_id, bib_number, finish_time)?;

        self.queue()
            .enqueue(QueueItem::new(Operation::RecordFinish(RecordFinishItem {
                race_id,
                runner_id: recorded.runner_id.clone(),
                bib_number,
                finish_time,
                device_id: Some(self.device_id.clone()),
            })))?;
        tracing::debug!(race = race_id.0, bib = bib_number, "Queued finish recording");
        Ok(recorded)
    }

    /// Queue a bulk finish upload, rows keyed by bib (the natural key the
    /// server resolves), applying each row to the local cache first
    pub fn record_finishes_bulk_local(
        &self,
        race_id: AuthoritativeId,
        rows: Vec<(i64, i64)>, // (bib_number, finish_time)
    ) -> Result<usize> {
        let mut applied = 0;
        for (bib_number, finish_time) in &rows {
            if self
                .record_finish_cache_only(race_id, *bib_number, *finish_time)
                .is_ok()
            {
                applied += 1;
            }
        }

        let results = rows
            .into_iter()
            .map(|(bib_number, finish_time)| crate::models::FinishRow {
                runner_id: None,
                bib_number: Some(bib_number),
                finish_time,
            })
            .collect();
        self.queue()
            .enqueue(QueueItem::new(Operation::RecordFinishesBulk(
                RecordFinishesBulkRequest {
                    race_id,
                    results,
                    device_id: Some(self.device_id.clone()),
                },
            )))?;
        Ok(applied)
    }

    /// Merge an authoritative runner into the cache by natural key (bib),
    /// then rewrite cached results that still reference the provisional
    /// runner so the discovered identity propagates everywhere it is used
    pub fn apply_authoritative_runner(
        &self,
        race_id: AuthoritativeId,
        runner: Runner,
    ) -> Result<Reconciled> {
        let cache = self.runners();
        let mut runners = cache.load(race_id)?;
        let previous_id = runners
            .iter()
            .find(|entry| entry.bib_number == runner.bib_number)
            .map(|entry| entry.id.clone());
        let discovered_id = runner.id.clone();
        let outcome = reconcile(&mut runners, runner, |a, b| a.bib_number == b.bib_number);
        cache.save(race_id, &runners)?;

        if let Some(previous_id) = previous_id.filter(crate::models::RecordId::is_provisional) {
            let results = self.results();
            let mut cached = results.load(race_id)?;
            let mut rewritten = false;
            for result in cached
                .iter_mut()
                .filter(|result| result.runner_id == previous_id)
            {
                result.runner_id = discovered_id.clone();
                rewritten = true;
            }
            if rewritten {
                results.save(race_id, &cached)?;
            }
        }
        Ok(outcome)
    }

    /// Merge an authoritative result into the cache. The natural key is the
    /// runner identity; `queued_runner_id` covers the entry that was cached
    /// while the runner itself was still provisional.
    pub fn apply_authoritative_result(
        &self,
        race_id: AuthoritativeId,
        result: FinishResult,
        queued_runner_id: Option<&crate::models::RecordId>,
    ) -> Result<Reconciled> {
        let cache = self.results();
        let mut results = cache.load(race_id)?;
        let outcome = reconcile(&mut results, result, |local, authoritative| {
            local.runner_id == authoritative.runner_id
                || queued_runner_id.is_some_and(|queued| local.runner_id == *queued)
        });
        assign_positions(&mut results, |r| r.finish_time, |r, p| r.position = Some(p));
        cache.save(race_id, &results)?;
        Ok(outcome)
    }

    /// Replace the runner cache with an authoritative listing
    pub fn replace_runners(&self, race_id: AuthoritativeId, runners: &[Runner]) -> Result<()> {
        self.runners().save(race_id, runners)
    }

    fn record_finish_cache_only(
        &self,
        race_id: AuthoritativeId,
        bib_number: i64,
        finish_time: i64,
    ) -> Result<FinishResult> {
        let runner = self
            .runners()
            .load(race_id)?
            .into_iter()
            .find(|runner| runner.bib_number == bib_number)
            .ok_or_else(|| Error::NotFound(format!("Runner with bib {bib_number} not found")))?;

        let cache = self.results();
        let mut results = cache.load(race_id)?;
        let recorded = match results
            .iter_mut()
            .find(|result| result.runner_id == runner.id)
        {
            Some(existing) => {
                existing.finish_time = finish_time;
                existing.device_id = Some(self.device_id.clone());
                existing.clone()
            }
            None => {
                let result = FinishResult::provisional(
                    race_id,
                    runner.id.clone(),
                    finish_time,
                    Some(self.device_id.clone()),
                );
                results.push(result.clone());
                result
            }
        };
        assign_positions(&mut results, |r| r.finish_time, |r, p| r.position = Some(p));
        cache.save(race_id, &results)?;
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordId;
    use crate::storage::MemoryKvStore;
    use pretty_assertions::assert_eq;

    fn session() -> Session<MemoryKvStore> {
        Session::new(Arc::new(MemoryKvStore::new()), "device-a")
    }

    #[test]
    fn test_add_runner_local_caches_and_queues() {
        let session = session();
        let race = AuthoritativeId(1);

        let runner = session
            .add_runner_local(race, 7, Some("Ada".into()))
            .unwrap();
        assert!(runner.local_only);

        assert_eq!(session.runners().load(race).unwrap().len(), 1);
        assert_eq!(session.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_add_runner_local_rejects_cached_duplicate() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 7, None).unwrap();

        let err = session.add_runner_local(race, 7, None).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(session.pending_count().unwrap(), 1);
    }

    #[test]
    fn test_record_finish_local_updates_in_place() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 7, None).unwrap();

        session.record_finish_local(race, 7, 1_125).unwrap();
        let corrected = session.record_finish_local(race, 7, 1_080).unwrap();
        assert_eq!(corrected.finish_time, 1_080);

        // One result row, two queued mutations (both replay safely)
        assert_eq!(session.results().load(race).unwrap().len(), 1);
        assert_eq!(session.pending_count().unwrap(), 3);
    }

    #[test]
    fn test_local_positions_follow_finish_time() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 1, None).unwrap();
        session.add_runner_local(race, 2, None).unwrap();

        // Bib 1 recorded first with the later time
        session.record_finish_local(race, 1, 1_125).unwrap();
        session.record_finish_local(race, 2, 1_080).unwrap();

        let results = session.results().load(race).unwrap();
        assert_eq!(results[0].finish_time, 1_080);
        assert_eq!(results[0].position, Some(1));
        assert_eq!(results[1].position, Some(2));
    }

    #[test]
    fn test_finish_for_unknown_bib_fails() {
        let session = session();
        let err = session
            .record_finish_local(AuthoritativeId(1), 99, 1_000)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_apply_authoritative_runner_merges_by_bib() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 7, None).unwrap();

        let outcome = session
            .apply_authoritative_runner(
                race,
                Runner {
                    id: AuthoritativeId(42).into(),
                    race_id: race,
                    bib_number: 7,
                    name: None,
                    local_only: false,
                },
            )
            .unwrap();
        assert_eq!(outcome, Reconciled::Merged(0));

        let runners = session.runners().load(race).unwrap();
        assert_eq!(runners.len(), 1);
        assert_eq!(runners[0].id, RecordId::Authoritative(AuthoritativeId(42)));
        assert!(!runners[0].local_only);
    }

    #[test]
    fn test_apply_authoritative_result_matches_provisional_runner_entry() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 7, None).unwrap();
        session.record_finish_local(race, 7, 1_125).unwrap();

        let queued_runner_id = session.results().load(race).unwrap()[0].runner_id.clone();
        assert!(queued_runner_id.is_provisional());

        let outcome = session
            .apply_authoritative_result(
                race,
                FinishResult {
                    id: AuthoritativeId(10).into(),
                    race_id: race,
                    runner_id: AuthoritativeId(42).into(),
                    finish_time: 1_125,
                    chip_time: None,
                    position: Some(1),
                    device_id: Some("device-a".into()),
                    local_only: false,
                },
                Some(&queued_runner_id),
            )
            .unwrap();
        assert_eq!(outcome, Reconciled::Merged(0));

        let results = session.results().load(race).unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].local_only);
        assert_eq!(results[0].id, RecordId::Authoritative(AuthoritativeId(10)));
    }

    #[test]
    fn test_runner_merge_propagates_identity_into_cached_results() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 7, None).unwrap();
        session.record_finish_local(race, 7, 1_125).unwrap();
        assert!(session.results().load(race).unwrap()[0]
            .runner_id
            .is_provisional());

        session
            .apply_authoritative_runner(
                race,
                Runner {
                    id: AuthoritativeId(42).into(),
                    race_id: race,
                    bib_number: 7,
                    name: None,
                    local_only: false,
                },
            )
            .unwrap();

        let results = session.results().load(race).unwrap();
        assert_eq!(
            results[0].runner_id,
            RecordId::Authoritative(AuthoritativeId(42))
        );
    }

    #[test]
    fn test_bulk_local_rows_queue_single_item() {
        let session = session();
        let race = AuthoritativeId(1);
        session.add_runner_local(race, 1, None).unwrap();
        session.add_runner_local(race, 2, None).unwrap();
        let before = session.pending_count().unwrap();

        let applied = session
            .record_finishes_bulk_local(race, vec![(1, 1_100), (2, 1_200), (9, 1_300)])
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(session.pending_count().unwrap(), before + 1);
    }
}
