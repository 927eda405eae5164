//! Identity reconciliation
//!
//! Once the authoritative store accepts an operation it returns the record
//! with its generated identifier. The matching local entry is found by
//! natural key (never by identifier, which is meaningless across identity
//! spaces) and replaced wholesale; the authoritative record carries
//! `local_only: false`, which clears the provisional marker in the same
//! step.

/// Outcome of merging one authoritative record into a local record set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// The authoritative record replaced the local entry at this index
    Merged(usize),
    /// No local entry matched; the record was appended rather than dropped.
    /// This indicates the queue and cache diverged at some point.
    Appended,
}

/// Merge `authoritative` into `local`, matching by `natural_key_matches`.
///
/// Pure with respect to its inputs: no hidden state, no clock, no store.
pub fn reconcile<T>(
    local: &mut Vec<T>,
    authoritative: T,
    natural_key_matches: impl Fn(&T, &T) -> bool,
) -> Reconciled {
    match local
        .iter()
        .position(|entry| natural_key_matches(entry, &authoritative))
    {
        Some(index) => {
            local[index] = authoritative;
            Reconciled::Merged(index)
        }
        None => {
            local.push(authoritative);
            Reconciled::Appended
        }
    }
}
