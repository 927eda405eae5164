//! Shared command context: session, remote, connectivity

use std::path::PathBuf;
use std::sync::Arc;

use racectl_core::client::{HttpRemote, Session, SharedConnectivity, SyncCoordinator, SyncOutcome};
use racectl_core::storage::{KvStore, SqliteKvStore};

use crate::cli::Cli;
use crate::error::CliError;

const DEVICE_ID_KEY: &str = "device_id";
const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8080";

/// Everything a command needs to talk locally and remotely
pub struct Context {
    pub session: Session<SqliteKvStore>,
    pub remote: HttpRemote,
    pub connectivity: SharedConnectivity,
}

impl Context {
    /// Build the context: open the device store, settle the device id,
    /// and probe the server once unless `--offline` forces the local path
    pub async fn build(cli: &Cli) -> Result<Self, CliError> {
        let data_dir = resolve_data_dir(cli.data_dir.clone())?;
        std::fs::create_dir_all(&data_dir)?;
        let store = Arc::new(SqliteKvStore::open(data_dir.join("device.db"))?);

        let device_id = settle_device_id(store.as_ref(), cli.device_id.clone())?;
        let session = Session::new(store, device_id);

        let server_url = cli
            .server_url
            .clone()
            .or_else(|| std::env::var("RACECTL_SERVER_URL").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let remote = HttpRemote::new(server_url)?;

        let online = !cli.offline && remote.healthz().await;
        tracing::debug!(online, "Connectivity probe complete");

        let ctx = Self {
            session,
            remote,
            connectivity: SharedConnectivity::new(online),
        };

        // Back online with queued work: drain before the command runs, so a
        // direct call never overtakes mutations recorded while offline
        if ctx.is_online() && ctx.session.pending_count()? > 0 {
            if let SyncOutcome::Drained(report) = ctx.coordinator().attempt_sync().await? {
                print_drain_report(&report);
            }
        }

        Ok(ctx)
    }

    #[must_use]
    pub fn is_online(&self) -> bool {
        use racectl_core::client::Connectivity;
        self.connectivity.is_online()
    }

    /// The sync coordinator over this context's session and remote
    #[must_use]
    pub fn coordinator(&self) -> SyncCoordinator<SqliteKvStore, HttpRemote, SharedConnectivity> {
        SyncCoordinator::new(
            self.session.clone(),
            self.remote.clone(),
            self.connectivity.clone(),
        )
    }
}

fn resolve_data_dir(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("racectl"))
        .ok_or(CliError::NoDataDir)
}

fn settle_device_id(store: &SqliteKvStore, explicit: Option<String>) -> Result<String, CliError> {
    if let Some(id) = explicit {
        store.set(DEVICE_ID_KEY, &id)?;
        return Ok(id);
    }
    if let Some(id) = store.get(DEVICE_ID_KEY)? {
        return Ok(id);
    }
    let id = uuid::Uuid::now_v7().to_string();
    store.set(DEVICE_ID_KEY, &id)?;
    Ok(id)
}

/// Report a drain to the user: counts always, details when present
pub fn print_drain_report(report: &racectl_core::client::DrainReport) {
    println!(
        "Synced {} item(s); {} kept for retry; {} rejected",
        report.synced,
        report.retained,
        report.rejected.len()
    );
    for rejected in &report.rejected {
        println!(
            "  rejected {} (race {}): {}",
            rejected.item.op.kind(),
            rejected.item.op.race_id(),
            rejected.error
        );
    }
    for row_error in &report.row_errors {
        println!("  row error: {row_error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_is_persisted() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        let first = settle_device_id(&store, None).unwrap();
        let second = settle_device_id(&store, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_explicit_device_id_overrides() {
        let store = SqliteKvStore::open_in_memory().unwrap();
        settle_device_id(&store, None).unwrap();
        let overridden = settle_device_id(&store, Some("finish-line-2".into())).unwrap();
        assert_eq!(overridden, "finish-line-2");
        // And it sticks for the next run
        assert_eq!(settle_device_id(&store, None).unwrap(), "finish-line-2");
    }
}
