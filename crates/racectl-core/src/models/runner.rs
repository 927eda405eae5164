//! Runner model

use serde::{Deserialize, Serialize};

use super::id::{AuthoritativeId, ProvisionalId, RecordId};

/// A registered participant. `bib_number` is the natural key within a race:
/// it is what the reconciler matches on when a provisional runner comes back
/// from the authoritative store with a generated identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Runner {
    pub id: RecordId,
    pub race_id: AuthoritativeId,
    pub bib_number: i64,
    pub name: Option<String>,
    /// True until the authoritative identifier is known. Client-side only;
    /// the server never emits it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub local_only: bool,
}

impl Runner {
    /// Create a provisional runner for offline registration
    #[must_use]
    pub fn provisional(race_id: AuthoritativeId, bib_number: i64, name: Option<String>) -> Self {
        Self {
            id: ProvisionalId::mint_for_bib(bib_number).into(),
            race_id,
            bib_number,
            name,
            local_only: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisional_runner_is_local_only() {
        let runner = Runner::provisional(AuthoritativeId(1), 7, Some("Ada".into()));
        assert!(runner.local_only);
        assert!(runner.id.is_provisional());
        assert_eq!(runner.bib_number, 7);
    }

    #[test]
    fn test_local_only_not_serialized_when_false() {
        let runner = Runner {
            id: AuthoritativeId(3).into(),
            race_id: AuthoritativeId(1),
            bib_number: 7,
            name: None,
            local_only: false,
        };
        let json = serde_json::to_string(&runner).unwrap();
        assert!(!json.contains("local_only"));

        let parsed: Runner = serde_json::from_str(&json).unwrap();
        assert!(!parsed.local_only);
    }
}
