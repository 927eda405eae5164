//! End-to-end: offline mutations drain into the real reconciliation
//! service and come back reconciled, without an HTTP layer in between.

use std::sync::{Arc, Mutex, PoisonError};

use racectl_core::client::{RemoteService, Session, SharedConnectivity, SyncCoordinator, SyncOutcome};
use racectl_core::db::Database;
use racectl_core::models::{
    AddRunnerRequest, AddRunnersBulkRequest, BulkFinishesResponse, BulkRunnersResponse,
    FinishRequest, FinishResult, RecordFinishesBulkRequest, Runner,
};
use racectl_core::service::ReconciliationService;
use racectl_core::storage::MemoryKvStore;
use racectl_core::Result;

/// The reconciliation service itself standing in for the HTTP boundary
struct InProcessRemote {
    db: Mutex<Database>,
}

impl InProcessRemote {
    fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn with_service<T>(&self, f: impl FnOnce(&ReconciliationService<'_>) -> Result<T>) -> Result<T> {
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        let service = ReconciliationService::new(db.connection());
        f(&service)
    }
}

impl RemoteService for InProcessRemote {
    async fn add_runner(&self, req: &AddRunnerRequest) -> Result<Runner> {
        self.with_service(|service| service.add_runner(req))
    }

    async fn add_runners_bulk(&self, req: &AddRunnersBulkRequest) -> Result<BulkRunnersResponse> {
        self.with_service(|service| service.add_runners_bulk(req))
    }

    async fn record_finish(&self, req: &FinishRequest) -> Result<FinishResult> {
        self.with_service(|service| service.record_finish(req))
    }

    async fn record_finishes_bulk(
        &self,
        req: &RecordFinishesBulkRequest,
    ) -> Result<BulkFinishesResponse> {
        self.with_service(|service| service.record_finishes_bulk(req))
    }
}

fn setup() -> (
    SyncCoordinator<MemoryKvStore, InProcessRemote, SharedConnectivity>,
    racectl_core::AuthoritativeId,
) {
    let db = Database::open_in_memory().unwrap();
    let race_id = {
        let service = ReconciliationService::new(db.connection());
        let race = service.create_race("Pub-to-Pub 2025", None).unwrap();
        service.start_race(race.id, Some(1_000)).unwrap().id
    };

    let session = Session::new(Arc::new(MemoryKvStore::new()), "device-a");
    let coordinator = SyncCoordinator::new(
        session,
        InProcessRemote::new(db),
        SharedConnectivity::new(true),
    );
    (coordinator, race_id)
}

fn drained(outcome: SyncOutcome) -> racectl_core::client::DrainReport {
    match outcome {
        SyncOutcome::Drained(report) => report,
        SyncOutcome::Skipped(reason) => panic!("expected drain, skipped: {reason:?}"),
    }
}

#[tokio::test]
async fn offline_registration_and_finish_reconcile_without_duplicates() {
    let (coordinator, race_id) = setup();
    let session = coordinator.session().clone();

    // Recorded while "offline": runner and finish both provisional
    session.add_runner_local(race_id, 7, Some("Ada".into())).unwrap();
    session.record_finish_local(race_id, 7, 1_125).unwrap();
    assert_eq!(session.pending_count().unwrap(), 2);

    let report = drained(coordinator.attempt_sync().await.unwrap());
    assert_eq!(report.synced, 2);
    assert_eq!(session.pending_count().unwrap(), 0);

    // Local cache now carries authoritative identity, no duplicates
    let runners = session.runners().load(race_id).unwrap();
    assert_eq!(runners.len(), 1);
    assert!(runners[0].id.authoritative().is_some());
    assert!(!runners[0].local_only);

    let results = session.results().load(race_id).unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].local_only);
    assert_eq!(results[0].position, Some(1));
}

#[tokio::test]
async fn replaying_a_drained_queue_creates_no_second_row() {
    let (coordinator, race_id) = setup();
    let session = coordinator.session().clone();

    session.add_runner_local(race_id, 7, None).unwrap();
    session.record_finish_local(race_id, 7, 1_125).unwrap();

    // Simulate a crash after the server applied everything but before the
    // queue write-back: replay the same items a second time
    let snapshot = session.queue().peek_all().unwrap();
    drained(coordinator.attempt_sync().await.unwrap());
    session.queue().replace_with(&snapshot).unwrap();

    let report = drained(coordinator.attempt_sync().await.unwrap());
    // The runner add is now a terminal duplicate-bib rejection; the finish
    // replays as an idempotent upsert
    assert_eq!(report.synced, 1);
    assert_eq!(report.rejected.len(), 1);

    let results = session.results().load(race_id).unwrap();
    assert_eq!(results.len(), 1);
    let runners = session.runners().load(race_id).unwrap();
    assert_eq!(runners.len(), 1);
}

#[tokio::test]
async fn positions_recompute_across_devices_and_corrections() {
    let (coordinator, race_id) = setup();
    let session = coordinator.session().clone();

    session.add_runner_local(race_id, 1, None).unwrap();
    session.add_runner_local(race_id, 2, None).unwrap();
    // Bib 1 recorded first, but with the later finish time
    session.record_finish_local(race_id, 1, 1_125).unwrap();
    session.record_finish_local(race_id, 2, 1_080).unwrap();

    drained(coordinator.attempt_sync().await.unwrap());

    let results = session.results().load(race_id).unwrap();
    let of_bib = |bib: i64| {
        let runners = session.runners().load(race_id).unwrap();
        let runner = runners.iter().find(|r| r.bib_number == bib).unwrap().clone();
        results
            .iter()
            .find(|r| r.runner_id == runner.id)
            .unwrap()
            .clone()
    };
    assert_eq!(of_bib(2).position, Some(1)); // elapsed 80s
    assert_eq!(of_bib(1).position, Some(2)); // elapsed 125s

    // Correct bib 1 to an earlier time than the already-ranked finish
    session.record_finish_local(race_id, 1, 1_050).unwrap();
    drained(coordinator.attempt_sync().await.unwrap());

    let results = session.results().load(race_id).unwrap();
    assert_eq!(results.len(), 2);
    let first = results.iter().find(|r| r.position == Some(1)).unwrap();
    assert_eq!(first.finish_time, 1_050);
}

#[tokio::test]
async fn bulk_import_then_bulk_finishes_resolve_by_bib() {
    let (coordinator, race_id) = setup();
    let session = coordinator.session().clone();

    session
        .import_runners_local(
            race_id,
            vec![
                racectl_core::models::RunnerRow {
                    bib_number: Some(1),
                    name: Some("Ada".into()),
                },
                racectl_core::models::RunnerRow {
                    bib_number: Some(2),
                    name: Some("Grace".into()),
                },
            ],
        )
        .unwrap();
    session
        .record_finishes_bulk_local(race_id, vec![(2, 1_300), (1, 1_200)])
        .unwrap();

    let report = drained(coordinator.attempt_sync().await.unwrap());
    assert_eq!(report.synced, 2);
    assert!(report.row_errors.is_empty());

    let results = session.results().load(race_id).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| !r.local_only));
}
