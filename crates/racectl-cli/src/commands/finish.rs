use racectl_core::client::RemoteService;
use racectl_core::models::{AuthoritativeId, FinishRequest};

use crate::error::CliError;

use super::common::Context;

/// Record a finish for a bib. Online, the server applies and ranks it
/// immediately; offline (or when the call fails in transit) it lands in the
/// local cache and queue, exactly as it will replay later.
pub async fn run_record(
    ctx: &Context,
    race: i64,
    bib: i64,
    time: Option<i64>,
) -> Result<(), CliError> {
    let race_id = AuthoritativeId(race);
    let finish_time = time.unwrap_or_else(|| chrono::Utc::now().timestamp());

    if ctx.is_online() {
        match record_online(ctx, race_id, bib, finish_time).await {
            Ok(()) => return Ok(()),
            Err(CliError::Core(err)) if !err.is_terminal() => {
                tracing::warn!(error = %err, "Online finish failed in transit; queueing");
            }
            Err(err) => return Err(err),
        }
    }

    let recorded = ctx.session.record_finish_local(race_id, bib, finish_time)?;
    println!(
        "Recorded finish for #{bib} at {} locally ({} pending)",
        recorded.finish_time,
        ctx.session.pending_count()?
    );
    Ok(())
}

async fn record_online(
    ctx: &Context,
    race_id: AuthoritativeId,
    bib: i64,
    finish_time: i64,
) -> Result<(), CliError> {
    // Refresh the runner cache while we have the server, then resolve the bib
    let runners = ctx.remote.list_runners(race_id).await?;
    ctx.session.replace_runners(race_id, &runners)?;
    let runner = runners
        .iter()
        .find(|runner| runner.bib_number == bib)
        .ok_or_else(|| {
            racectl_core::Error::NotFound(format!("Runner with bib {bib} not found"))
        })?;
    let runner_id = runner.id.authoritative().ok_or_else(|| {
        racectl_core::Error::NotFound(format!("Runner with bib {bib} not reconciled"))
    })?;

    let result = ctx
        .remote
        .record_finish(&FinishRequest {
            race_id,
            runner_id,
            finish_time,
            device_id: Some(ctx.session.device_id().to_string()),
        })
        .await?;

    let position = result.position;
    ctx.session
        .apply_authoritative_result(race_id, result, None)?;
    match position {
        Some(position) => println!("Recorded finish for #{bib}: position {position}"),
        None => println!("Recorded finish for #{bib}"),
    }
    Ok(())
}
