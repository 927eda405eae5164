//! Data models for Race Control

mod id;
mod payload;
mod queue;
mod race;
mod result;
mod runner;

pub use id::{AuthoritativeId, ProvisionalId, RecordId};
pub use payload::{
    AddRunnerRequest, AddRunnersBulkRequest, BulkFinishesResponse, BulkRunnersResponse,
    CreateRaceRequest, FinishRequest, FinishRow, RecordFinishesBulkRequest, RowError, RunnerRow,
    UpdateRaceRequest,
};
pub use queue::{Operation, QueueItem, RecordFinishItem};
pub use race::{Race, RaceStatus};
pub use result::{FinishResult, ResultView};
pub use runner::Runner;
