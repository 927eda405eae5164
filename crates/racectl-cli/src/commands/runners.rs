use std::path::Path;

use racectl_core::client::RemoteService;
use racectl_core::models::{AddRunnerRequest, AuthoritativeId, RunnerRow};

use crate::error::CliError;

use super::common::Context;

pub async fn run_add(
    ctx: &Context,
    race: i64,
    bib: i64,
    name: Option<String>,
) -> Result<(), CliError> {
    let race_id = AuthoritativeId(race);

    if ctx.is_online() {
        let request = AddRunnerRequest {
            race_id,
            bib_number: bib,
            name: name.clone(),
        };
        match ctx.remote.add_runner(&request).await {
            Ok(runner) => {
                ctx.session.apply_authoritative_runner(race_id, runner)?;
                println!("Registered runner #{bib}");
                return Ok(());
            }
            Err(err) if err.is_terminal() => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %err, "Online add failed in transit; queueing");
            }
        }
    }

    ctx.session.add_runner_local(race_id, bib, name)?;
    println!(
        "Registered runner #{bib} locally ({} pending)",
        ctx.session.pending_count()?
    );
    Ok(())
}

pub async fn run_import(ctx: &Context, race: i64, file: &Path) -> Result<(), CliError> {
    let race_id = AuthoritativeId(race);
    let rows = parse_import(&std::fs::read_to_string(file)?)?;

    if ctx.is_online() {
        let request = racectl_core::models::AddRunnersBulkRequest {
            race_id,
            runners: rows.clone(),
        };
        match ctx.remote.add_runners_bulk(&request).await {
            Ok(response) => {
                let added = response.added.len();
                for runner in response.added {
                    ctx.session.apply_authoritative_runner(race_id, runner)?;
                }
                println!("Imported {added} runner(s), {} error(s)", response.errors.len());
                for row_error in &response.errors {
                    println!(
                        "  bib {}: {}",
                        row_error
                            .row
                            .bib_number
                            .map_or_else(|| "?".to_string(), |b| b.to_string()),
                        row_error.error
                    );
                }
                return Ok(());
            }
            Err(err) if err.is_terminal() => return Err(err.into()),
            Err(err) => {
                tracing::warn!(error = %err, "Online import failed in transit; queueing");
            }
        }
    }

    let imported = ctx.session.import_runners_local(race_id, rows)?;
    println!(
        "Imported {} runner(s) locally ({} pending)",
        imported.len(),
        ctx.session.pending_count()?
    );
    Ok(())
}

pub async fn run_list(ctx: &Context, race: i64, as_json: bool) -> Result<(), CliError> {
    let race_id = AuthoritativeId(race);
    let runners = if ctx.is_online() {
        let runners = ctx.remote.list_runners(race_id).await?;
        ctx.session.replace_runners(race_id, &runners)?;
        runners
    } else {
        let cached = ctx.session.runners().load(race_id)?;
        println!("(offline: showing cached runners)");
        cached
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&runners)?);
        return Ok(());
    }

    if runners.is_empty() {
        println!("No runners registered for race {race}.");
        return Ok(());
    }
    for runner in runners {
        let marker = if runner.local_only { " (unsynced)" } else { "" };
        println!(
            "#{} {}{marker}",
            runner.bib_number,
            runner.name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Parse `bib,name` lines; blank lines and `#` comments are skipped
fn parse_import(content: &str) -> Result<Vec<RunnerRow>, CliError> {
    let mut rows = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (bib, name) = match line.split_once(',') {
            Some((bib, name)) => (bib.trim(), Some(name.trim())),
            None => (line, None),
        };
        let bib_number: i64 = bib
            .parse()
            .map_err(|_| CliError::MalformedImportLine(index + 1, line.to_string()))?;
        rows.push(RunnerRow {
            bib_number: Some(bib_number),
            name: name.filter(|n| !n.is_empty()).map(ToString::to_string),
        });
    }
    if rows.is_empty() {
        return Err(CliError::EmptyImport);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_import_rows() {
        let rows = parse_import("7,Ada Lovelace\n8\n\n# comment\n9, Grace \n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].bib_number, Some(7));
        assert_eq!(rows[0].name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(rows[1].bib_number, Some(8));
        assert_eq!(rows[1].name, None);
        assert_eq!(rows[2].name.as_deref(), Some("Grace"));
    }

    #[test]
    fn test_parse_import_rejects_bad_bib() {
        let err = parse_import("seven,Ada").unwrap_err();
        assert!(matches!(err, CliError::MalformedImportLine(1, _)));
    }

    #[test]
    fn test_parse_import_rejects_empty() {
        assert!(matches!(parse_import("\n# nothing\n"), Err(CliError::EmptyImport)));
    }
}
