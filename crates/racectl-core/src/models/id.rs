//! Dual identifier spaces: provisional (client-minted) and authoritative
//! (store-generated). The two never coerce implicitly; a provisional
//! identifier is only ever replaced through natural-key reconciliation.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};

/// Prefix carried by every client-minted identifier
const PROVISIONAL_PREFIX: &str = "local_";

/// A row identifier generated by the authoritative store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthoritativeId(pub i64);

impl fmt::Display for AuthoritativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A client-minted identifier, valid only on the device that created it.
/// The authoritative store never sees one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvisionalId(String);

// Last minted millisecond timestamp; bumped past `now` on collision so two
// mints in the same millisecond still produce distinct identifiers.
static LAST_MINTED_MILLIS: AtomicI64 = AtomicI64::new(0);

fn next_mint_millis() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut last = LAST_MINTED_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_MINTED_MILLIS.compare_exchange(last, next, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return next,
            Err(observed) => last = observed,
        }
    }
}

impl ProvisionalId {
    /// Mint a new provisional identifier (`local_<millis>`)
    #[must_use]
    pub fn mint() -> Self {
        Self(format!("{PROVISIONAL_PREFIX}{}", next_mint_millis()))
    }

    /// Mint a provisional identifier tagged with a bib number
    /// (`local_<millis>_<bib>`)
    #[must_use]
    pub fn mint_for_bib(bib_number: i64) -> Self {
        Self(format!(
            "{PROVISIONAL_PREFIX}{}_{bib_number}",
            next_mint_millis()
        ))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProvisionalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProvisionalId {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with(PROVISIONAL_PREFIX) {
            Ok(Self(s.to_string()))
        } else {
            Err(crate::error::Error::Invalid(format!(
                "not a provisional identifier: {s}"
            )))
        }
    }
}

/// An identifier that may live in either space. Serialized untagged: an
/// integer on the wire is authoritative, a string is provisional.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Authoritative(AuthoritativeId),
    Provisional(ProvisionalId),
}

impl RecordId {
    /// The authoritative identifier, if this record has been reconciled
    #[must_use]
    pub const fn authoritative(&self) -> Option<AuthoritativeId> {
        match self {
            Self::Authoritative(id) => Some(*id),
            Self::Provisional(_) => None,
        }
    }

    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        matches!(self, Self::Provisional(_))
    }
}

impl From<AuthoritativeId> for RecordId {
    fn from(id: AuthoritativeId) -> Self {
        Self::Authoritative(id)
    }
}

impl From<ProvisionalId> for RecordId {
    fn from(id: ProvisionalId) -> Self {
        Self::Provisional(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authoritative(id) => id.fmt(f),
            Self::Provisional(id) => id.fmt(f),
        }
    }
}
