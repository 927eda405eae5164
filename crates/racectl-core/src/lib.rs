//! racectl-core - Core library for Race Control
//!
//! This crate contains the shared models, the authoritative store and
//! reconciliation service, and the offline-first client engine used by the
//! API server and the timing-device CLI.

pub mod client;
pub mod db;
pub mod error;
pub mod models;
pub mod service;
pub mod storage;

pub use error::{Error, Result};
pub use models::{AuthoritativeId, ProvisionalId, RecordId};
