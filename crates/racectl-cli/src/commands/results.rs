use racectl_core::models::AuthoritativeId;

use crate::error::CliError;

use super::common::Context;

pub async fn run_list(ctx: &Context, race: i64, as_json: bool) -> Result<(), CliError> {
    let race_id = AuthoritativeId(race);

    if ctx.is_online() {
        let views = ctx.remote.list_results(race_id).await?;
        if as_json {
            println!("{}", serde_json::to_string_pretty(&views)?);
            return Ok(());
        }
        if views.is_empty() {
            println!("No finishes recorded for race {race}.");
            return Ok(());
        }
        for view in views {
            println!(
                "{:>3}. #{} {} elapsed {}",
                view.position.map_or_else(|| "-".to_string(), |p| p.to_string()),
                view.bib_number,
                view.runner_name.as_deref().unwrap_or("-"),
                view.elapsed_time
                    .map_or_else(|| "-".to_string(), |secs| format!("{secs}s")),
            );
        }
        return Ok(());
    }

    // Offline: the cached view, with locally-computed positions
    let results = ctx.session.results().load(race_id)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("No finishes recorded for race {race}.");
        return Ok(());
    }
    println!("(offline: showing cached results)");
    let runners = ctx.session.runners().load(race_id)?;
    for result in results {
        let bib = runners
            .iter()
            .find(|runner| runner.id == result.runner_id)
            .map_or_else(|| "?".to_string(), |runner| runner.bib_number.to_string());
        let marker = if result.local_only { " (unsynced)" } else { "" };
        println!(
            "{:>3}. #{bib} finished {}{marker}",
            result.position.map_or_else(|| "-".to_string(), |p| p.to_string()),
            result.finish_time,
        );
    }
    Ok(())
}
