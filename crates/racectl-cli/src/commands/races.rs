use racectl_core::models::{AuthoritativeId, CreateRaceRequest, Race};

use crate::error::CliError;

use super::common::Context;

pub async fn run_list(ctx: &Context, as_json: bool) -> Result<(), CliError> {
    let races = if ctx.is_online() {
        let races = ctx.remote.list_races().await?;
        ctx.session.cache_races(&races)?;
        races
    } else {
        let cached = ctx.session.cached_races()?;
        if cached.is_empty() {
            return Err(CliError::RequiresConnection);
        }
        println!("(offline: showing cached races)");
        cached
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&races)?);
        return Ok(());
    }

    if races.is_empty() {
        println!("No races found. Create one with `racectl races create`.");
        return Ok(());
    }
    for race in races {
        print_race_line(&race);
    }
    Ok(())
}

pub async fn run_create(
    ctx: &Context,
    name: String,
    description: Option<String>,
) -> Result<(), CliError> {
    require_online(ctx)?;
    let race = ctx
        .remote
        .create_race(&CreateRaceRequest { name, description })
        .await?;
    println!("Created race {} ({})", race.id, race.name);
    refresh_race_cache(ctx).await?;
    Ok(())
}

pub async fn run_start(ctx: &Context, id: i64) -> Result<(), CliError> {
    require_online(ctx)?;
    let race = ctx.remote.start_race(AuthoritativeId(id)).await?;
    let start_time = race.start_time.unwrap_or_default();
    println!("Race {} started at {start_time}", race.id);
    refresh_race_cache(ctx).await?;
    Ok(())
}

pub async fn run_end(ctx: &Context, id: i64) -> Result<(), CliError> {
    require_online(ctx)?;
    let race = ctx.remote.end_race(AuthoritativeId(id)).await?;
    println!("Race {} completed", race.id);
    refresh_race_cache(ctx).await?;
    Ok(())
}

fn require_online(ctx: &Context) -> Result<(), CliError> {
    if ctx.is_online() {
        Ok(())
    } else {
        // Race lifecycle changes are authoritative-only; they never queue
        Err(CliError::RequiresConnection)
    }
}

async fn refresh_race_cache(ctx: &Context) -> Result<(), CliError> {
    let races = ctx.remote.list_races().await?;
    ctx.session.cache_races(&races)?;
    Ok(())
}

fn print_race_line(race: &Race) {
    let start = race
        .start_time
        .map_or_else(|| "not started".to_string(), |t| format!("started {t}"));
    println!(
        "#{} {} [{}] {}",
        race.id, race.name, race.status, start
    );
}
