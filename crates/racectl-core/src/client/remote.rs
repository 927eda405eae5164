//! Boundary to the reconciliation service
//!
//! The coordinator drains the queue through this trait so it can be tested
//! against a scripted fake without a server.

use crate::error::Result;
use crate::models::{
    AddRunnerRequest, AddRunnersBulkRequest, BulkFinishesResponse, BulkRunnersResponse,
    FinishRequest, FinishResult, RecordFinishesBulkRequest, Runner,
};

/// The four reconciliation operations a queued mutation can replay into
#[allow(async_fn_in_trait)]
pub trait RemoteService {
    /// Create-or-conflict by (race, bib)
    async fn add_runner(&self, req: &AddRunnerRequest) -> Result<Runner>;

    /// Per-row create-or-error
    async fn add_runners_bulk(&self, req: &AddRunnersBulkRequest) -> Result<BulkRunnersResponse>;

    /// Upsert by (race, runner); triggers a rerank
    async fn record_finish(&self, req: &FinishRequest) -> Result<FinishResult>;

    /// Per-row upsert by bib or id; single rerank at the end
    async fn record_finishes_bulk(
        &self,
        req: &RecordFinishesBulkRequest,
    ) -> Result<BulkFinishesResponse>;
}
