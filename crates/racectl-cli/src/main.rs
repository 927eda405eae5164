mod cli;
mod commands;
mod error;

use clap::Parser;

use cli::{Cli, Commands, RaceCommands, RunnerCommands, SyncCommands};
use commands::common::Context;
use error::CliError;

#[tokio::main]
async fn main() {
    #[cfg(debug_assertions)]
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::build(&cli).await?;

    match cli.command {
        Commands::Races { ref command } => match command {
            RaceCommands::List { json } => commands::races::run_list(&ctx, *json).await,
            RaceCommands::Create { name, description } => {
                commands::races::run_create(&ctx, name.clone(), description.clone()).await
            }
            RaceCommands::Start { id } => commands::races::run_start(&ctx, *id).await,
            RaceCommands::End { id } => commands::races::run_end(&ctx, *id).await,
        },
        Commands::Runners { ref command } => match command {
            RunnerCommands::Add { race, bib, name } => {
                commands::runners::run_add(&ctx, *race, *bib, name.clone()).await
            }
            RunnerCommands::Import { race, file } => {
                commands::runners::run_import(&ctx, *race, file).await
            }
            RunnerCommands::List { race, json } => {
                commands::runners::run_list(&ctx, *race, *json).await
            }
        },
        Commands::Finish { race, bib, time } => {
            commands::finish::run_record(&ctx, race, bib, time).await
        }
        Commands::Results { race, json } => commands::results::run_list(&ctx, race, json).await,
        Commands::Sync { command } => match command.unwrap_or(SyncCommands::Run) {
            SyncCommands::Run => commands::sync::run_sync(&ctx).await,
            SyncCommands::Status => commands::sync::run_status(&ctx),
        },
    }
}
