//! Sync queue item model
//!
//! A queue item is created for every locally-applied mutation taken while
//! disconnected (or when an online attempt fails in transit), and removed
//! only once the reconciliation service accepts it or rejects its content
//! terminally.

use serde::{Deserialize, Serialize};

use super::id::{AuthoritativeId, RecordId};
use super::payload::{AddRunnerRequest, AddRunnersBulkRequest, RecordFinishesBulkRequest};

/// The queued shape of a single finish recording. Unlike the wire request,
/// the runner reference may still be provisional, so the natural key (bib)
/// travels with it; the coordinator resolves the authoritative runner id
/// through the local cache just before submitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFinishItem {
    pub race_id: AuthoritativeId,
    pub runner_id: RecordId,
    pub bib_number: i64,
    /// Epoch seconds
    pub finish_time: i64,
    pub device_id: Option<String>,
}

/// A queued mutation, tagged by operation kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Operation {
    AddRunner(AddRunnerRequest),
    AddRunnersBulk(AddRunnersBulkRequest),
    RecordFinish(RecordFinishItem),
    RecordFinishesBulk(RecordFinishesBulkRequest),
}

impl Operation {
    /// The race this operation is scoped to
    #[must_use]
    pub const fn race_id(&self) -> AuthoritativeId {
        match self {
            Self::AddRunner(req) => req.race_id,
            Self::AddRunnersBulk(req) => req.race_id,
            Self::RecordFinish(item) => item.race_id,
            Self::RecordFinishesBulk(req) => req.race_id,
        }
    }

    /// Short name for logs and drain reports
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AddRunner(_) => "add_runner",
            Self::AddRunnersBulk(_) => "add_runners_bulk",
            Self::RecordFinish(_) => "record_finish",
            Self::RecordFinishesBulk(_) => "record_finishes_bulk",
        }
    }
}

/// One entry of the durable mutation queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    #[serde(flatten)]
    pub op: Operation,
    /// Epoch milliseconds at enqueue time
    pub created_at: i64,
}

impl QueueItem {
    /// Wrap an operation with the current timestamp
    #[must_use]
    pub fn new(op: Operation) -> Self {
        Self {
            op,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}
