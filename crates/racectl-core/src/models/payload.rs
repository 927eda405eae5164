//! Request and response payloads crossing the client/server boundary

use serde::{Deserialize, Serialize};

use super::id::AuthoritativeId;
use super::result::FinishResult;
use super::runner::Runner;

/// Create-or-conflict by (race, bib)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRunnerRequest {
    pub race_id: AuthoritativeId,
    pub bib_number: i64,
    pub name: Option<String>,
}

/// One row of a bulk runner import. The bib is optional so a malformed row
/// surfaces as a per-row Invalid error instead of a deserialization failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerRow {
    pub bib_number: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRunnersBulkRequest {
    pub race_id: AuthoritativeId,
    pub runners: Vec<RunnerRow>,
}

/// Upsert by (race, runner); triggers a rerank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRequest {
    pub race_id: AuthoritativeId,
    pub runner_id: AuthoritativeId,
    /// Epoch seconds
    pub finish_time: i64,
    pub device_id: Option<String>,
}

/// One row of a bulk finish upload; identifies the runner by authoritative
/// id or by bib number (bib is resolved server-side)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishRow {
    pub runner_id: Option<AuthoritativeId>,
    pub bib_number: Option<i64>,
    pub finish_time: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFinishesBulkRequest {
    pub race_id: AuthoritativeId,
    pub results: Vec<FinishRow>,
    pub device_id: Option<String>,
}

/// A rejected row from a bulk operation, reported alongside the rows that
/// succeeded; one bad row never aborts the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError<T> {
    pub row: T,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRunnersResponse {
    pub added: Vec<Runner>,
    pub errors: Vec<RowError<RunnerRow>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkFinishesResponse {
    pub processed: Vec<FinishResult>,
    pub errors: Vec<RowError<FinishRow>>,
}

/// Create a race (online-only operation)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRaceRequest {
    pub name: String,
    pub description: Option<String>,
}

/// Edit race name/description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRaceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
