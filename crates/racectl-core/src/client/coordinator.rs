//! Sync coordinator
//!
//! Drains the mutation queue against the reconciliation service, one item
//! at a time, strictly in original order: a queued finish may depend on a
//! runner queued before it becoming resolvable by natural key. At most one
//! drain runs at a time; the guard is taken before the first await.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};
use crate::models::{FinishRequest, Operation, QueueItem, RecordFinishItem};
use crate::storage::KvStore;

use super::connectivity::Connectivity;
use super::remote::RemoteService;
use super::session::Session;

/// What a sync attempt did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing was attempted: offline, or a drain is already in flight
    Skipped(SkipReason),
    /// A drain pass ran to completion
    Drained(DrainReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

/// Per-drain accounting, surfaced to the user after every pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Items the service accepted
    pub synced: usize,
    /// Items kept for the next drain (transient failures)
    pub retained: usize,
    /// Items the service rejected on content; removed from the queue
    pub rejected: Vec<RejectedItem>,
    /// Row-level errors from accepted bulk items
    pub row_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedItem {
    pub item: QueueItem,
    pub error: String,
}

/// Single-flight queue drainer
pub struct SyncCoordinator<S, R, C> {
    session: Session<S>,
    remote: R,
    connectivity: C,
    in_flight: AtomicBool,
}

impl<S, R, C> SyncCoordinator<S, R, C>
where
    S: KvStore,
    R: RemoteService,
    C: Connectivity,
{
    /// Create a coordinator over a session, remote boundary, and
    /// connectivity signal
    pub fn new(session: Session<S>, remote: R, connectivity: C) -> Self {
        Self {
            session,
            remote,
            connectivity,
            in_flight: AtomicBool::new(false),
        }
    }

    /// The session this coordinator drains for
    pub const fn session(&self) -> &Session<S> {
        &self.session
    }

    /// Drain the queue if online and not already draining.
    ///
    /// Mutations enqueued while the drain is running are left for the next
    /// pass: the write-back keeps everything past the drained snapshot.
    pub async fn attempt_sync(&self) -> Result<SyncOutcome> {
        if !self.connectivity.is_online() {
            return Ok(SyncOutcome::Skipped(SkipReason::Offline));
        }
        // Check-and-set before any asynchronous work starts
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(SyncOutcome::Skipped(SkipReason::AlreadyRunning));
        }
        let _guard = InFlightGuard(&self.in_flight);

        let report = self.drain().await?;
        Ok(SyncOutcome::Drained(report))
    }

    /// User-triggered sync; fails fast and visibly when disconnected
    pub async fn manual_sync(&self) -> Result<SyncOutcome> {
        if !self.connectivity.is_online() {
            return Err(Error::Offline);
        }
        self.attempt_sync().await
    }

    /// Deliver a connectivity transition. The offline -> online edge
    /// triggers exactly one sync attempt.
    pub async fn handle_connectivity_change(&self, online: bool) -> Result<SyncOutcome> {
        if online {
            tracing::info!("Connectivity regained, attempting sync");
            self.attempt_sync().await
        } else {
            tracing::info!("Connectivity lost, mutations will queue");
            Ok(SyncOutcome::Skipped(SkipReason::Offline))
        }
    }

    async fn drain(&self) -> Result<DrainReport> {
        let queue = self.session.queue();
        let snapshot = queue.peek_all()?;
        let mut report = DrainReport::default();

        let mut retained = Vec::new();
        for item in &snapshot {
            match self.submit(item, &mut report.row_errors).await {
                Ok(()) => report.synced += 1,
                Err(err) if err.is_terminal() => {
                    tracing::warn!(
                        kind = item.op.kind(),
                        race = item.op.race_id().0,
                        error = %err,
                        "Dropping rejected queue item"
                    );
                    report.rejected.push(RejectedItem {
                        item: item.clone(),
                        error: err.to_string(),
                    });
                }
                Err(err) => {
                    tracing::debug!(
                        kind = item.op.kind(),
                        error = %err,
                        "Keeping queue item for retry"
                    );
                    retained.push(item.clone());
                }
            }
        }
        report.retained = retained.len();

        // Keep anything enqueued after the snapshot was taken
        let current = queue.peek_all()?;
        retained.extend_from_slice(&current[snapshot.len().min(current.len())..]);
        queue.replace_with(&retained)?;

        tracing::info!(
            synced = report.synced,
            retained = report.retained,
            rejected = report.rejected.len(),
            "Drain pass complete"
        );
        Ok(report)
    }

    async fn submit(&self, item: &QueueItem, row_errors: &mut Vec<String>) -> Result<()> {
        match &item.op {
            Operation::AddRunner(req) => {
                let runner = self.remote.add_runner(req).await?;
                self.session.apply_authoritative_runner(req.race_id, runner)?;
            }
            Operation::AddRunnersBulk(req) => {
                let response = self.remote.add_runners_bulk(req).await?;
                for runner in response.added {
                    self.session.apply_authoritative_runner(req.race_id, runner)?;
                }
                for row_error in response.errors {
                    row_errors.push(format!(
                        "runner row (bib {:?}): {}",
                        row_error.row.bib_number, row_error.error
                    ));
                }
            }
            Operation::RecordFinish(queued) => {
                let request = self.resolve_finish(queued)?;
                let result = self.remote.record_finish(&request).await?;
                self.session.apply_authoritative_result(
                    queued.race_id,
                    result,
                    Some(&queued.runner_id),
                )?;
            }
            Operation::RecordFinishesBulk(req) => {
                let response = self.remote.record_finishes_bulk(req).await?;
                for result in response.processed {
                    self.session
                        .apply_authoritative_result(req.race_id, result, None)?;
                }
                for row_error in response.errors {
                    row_errors.push(format!(
                        "finish row (bib {:?}): {}",
                        row_error.row.bib_number, row_error.error
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build the wire request for a queued finish, resolving a provisional
    /// runner identity through the cache by natural key. The runner's own
    /// add sits earlier in the queue, so by the time this item is reached a
    /// successful drain has already given the cache the authoritative id;
    /// if it hasn't (the add failed transiently), the item stays queued.
    fn resolve_finish(&self, queued: &RecordFinishItem) -> Result<FinishRequest> {
        let runner_id = match queued.runner_id.authoritative() {
            Some(id) => id,
            None => self
                .session
                .runners()
                .load(queued.race_id)?
                .into_iter()
                .find(|runner| runner.bib_number == queued.bib_number)
                .and_then(|runner| runner.id.authoritative())
                .ok_or_else(|| {
                    Error::UnresolvedIdentity(format!(
                        "runner with bib {} has no authoritative id yet",
                        queued.bib_number
                    ))
                })?,
        };

        Ok(FinishRequest {
            race_id: queued.race_id,
            runner_id,
            finish_time: queued.finish_time,
            device_id: queued.device_id.clone(),
        })
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
