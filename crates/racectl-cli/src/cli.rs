use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "racectl")]
#[command(about = "Record race finishes from the finish line, online or offline")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Base URL of the racectl API server
    #[arg(long, global = true, value_name = "URL")]
    pub server_url: Option<String>,

    /// Directory for the device's local queue and caches
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Override the persisted device identifier
    #[arg(long, global = true, value_name = "ID")]
    pub device_id: Option<String>,

    /// Skip the connectivity probe and work from the local queue only
    #[arg(long, global = true)]
    pub offline: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage races
    Races {
        #[command(subcommand)]
        command: RaceCommands,
    },
    /// Manage runners within a race
    Runners {
        #[command(subcommand)]
        command: RunnerCommands,
    },
    /// Record a finish for a bib number
    Finish {
        /// Race identifier
        #[arg(long)]
        race: i64,
        /// Bib number crossing the line
        bib: i64,
        /// Finish time as epoch seconds (defaults to now)
        #[arg(long)]
        time: Option<i64>,
    },
    /// Show results for a race
    Results {
        /// Race identifier
        #[arg(long)]
        race: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drain or inspect the sync queue
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
}

#[derive(Subcommand)]
pub enum RaceCommands {
    /// List known races
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a new race
    Create {
        /// Race name
        name: String,
        /// Optional description
        #[arg(long)]
        description: Option<String>,
    },
    /// Start a race (stamps the start time exactly once)
    Start {
        /// Race identifier
        id: i64,
    },
    /// End an active race
    End {
        /// Race identifier
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum RunnerCommands {
    /// Register a single runner
    Add {
        /// Race identifier
        #[arg(long)]
        race: i64,
        /// Bib number (unique within the race)
        bib: i64,
        /// Runner display name
        #[arg(long)]
        name: Option<String>,
    },
    /// Import runners from a `bib,name` lines file
    Import {
        /// Race identifier
        #[arg(long)]
        race: i64,
        /// Path to the import file
        file: PathBuf,
    },
    /// List runners for a race
    List {
        /// Race identifier
        #[arg(long)]
        race: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Drain the queue now (fails fast when offline)
    Run,
    /// Show pending count and connectivity
    Status,
}
