use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] racectl_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No data directory available; pass --data-dir")]
    NoDataDir,
    #[error("This command needs a server connection. Retry without --offline once the network is back.")]
    RequiresConnection,
    #[error("Import file has no usable rows")]
    EmptyImport,
    #[error("Import line {0}: {1}")]
    MalformedImportLine(usize, String),
}
