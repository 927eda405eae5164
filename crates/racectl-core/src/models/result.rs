//! Finish result model

use serde::{Deserialize, Serialize};

use super::id::{AuthoritativeId, ProvisionalId, RecordId};

/// A recorded finish. At most one exists per (race, runner); re-recording
/// the same runner updates the row in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishResult {
    pub id: RecordId,
    pub race_id: AuthoritativeId,
    pub runner_id: RecordId,
    /// Epoch seconds
    pub finish_time: i64,
    pub chip_time: Option<i64>,
    /// Derived by the ranking pass; never set directly by a client
    pub position: Option<i64>,
    pub device_id: Option<String>,
    /// True until the authoritative identifier is known. Client-side only.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub local_only: bool,
}

impl FinishResult {
    /// Create a provisional finish for offline recording
    #[must_use]
    pub fn provisional(
        race_id: AuthoritativeId,
        runner_id: RecordId,
        finish_time: i64,
        device_id: Option<String>,
    ) -> Self {
        Self {
            id: ProvisionalId::mint().into(),
            race_id,
            runner_id,
            finish_time,
            chip_time: None,
            position: None,
            device_id,
            local_only: true,
        }
    }
}

/// A result row joined with its runner, as served by result listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultView {
    pub id: AuthoritativeId,
    pub race_id: AuthoritativeId,
    pub runner_id: AuthoritativeId,
    pub finish_time: i64,
    pub chip_time: Option<i64>,
    pub position: Option<i64>,
    pub device_id: Option<String>,
    pub bib_number: i64,
    pub runner_name: Option<String>,
    /// Seconds since the race started, when the race has a start time
    pub elapsed_time: Option<i64>,
}
