//! Database layer for the authoritative store

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{
    RaceRepository, ResultRepository, RunnerRepository, SqliteRaceRepository,
    SqliteResultRepository, SqliteRunnerRepository,
};
