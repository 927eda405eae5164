//! Race model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::id::AuthoritativeId;

/// Race lifecycle. Transitions are monotonic: pending -> active -> completed,
/// never back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceStatus {
    Pending,
    Active,
    Completed,
}

impl RaceStatus {
    /// Finish events are only accepted once the race has started
    #[must_use]
    pub const fn accepts_finishes(self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RaceStatus {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(crate::error::Error::Invalid(format!(
                "unknown race status: {other}"
            ))),
        }
    }
}

/// A race owned by the authoritative store. Races are only ever created and
/// transitioned online; the offline queue carries runner and result
/// mutations, never race mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub id: AuthoritativeId,
    pub name: String,
    pub description: Option<String>,
    pub status: RaceStatus,
    /// Epoch seconds; set exactly once on the transition to active
    pub start_time: Option<i64>,
    /// Epoch seconds
    pub created_at: i64,
}
