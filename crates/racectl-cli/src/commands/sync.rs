use racectl_core::client::SyncOutcome;

use crate::error::CliError;

use super::common::{print_drain_report, Context};

pub async fn run_sync(ctx: &Context) -> Result<(), CliError> {
    let coordinator = ctx.coordinator();
    match coordinator.manual_sync().await? {
        SyncOutcome::Drained(report) => print_drain_report(&report),
        SyncOutcome::Skipped(reason) => println!("Sync skipped: {reason:?}"),
    }
    Ok(())
}

pub fn run_status(ctx: &Context) -> Result<(), CliError> {
    let pending = ctx.session.pending_count()?;
    let connectivity = if ctx.is_online() { "online" } else { "offline" };
    println!("{connectivity}; {pending} item(s) pending sync");
    Ok(())
}
