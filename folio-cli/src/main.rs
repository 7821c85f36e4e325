//! folioctl - admin command line for the folio portfolio database
//!
//! Manages projects and their technologies, contact submissions
//! ("connections"), feedback, reviews and portfolio counters. Every command
//! goes through the retry-wrapped repositories in `folio-db`.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_core::FolioConfig;
use folio_db::{pool, Folio};
use tracing::info;

mod commands;
mod config;
mod tracing_setup;

use commands::Session;
use tracing_setup::TracingConfig;

#[derive(Parser, Debug)]
#[command(
    name = "folioctl",
    author,
    version,
    about = "Admin tool for the folio portfolio database",
    long_about = "Manage portfolio projects, technologies, contact submissions, feedback and \
                  reviews. Reads ~/.folio/config.toml (or $FOLIO_CONFIG) and DATABASE_URL."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// PostgreSQL connection string, overrides the config file
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,
    /// Counts for projects, unread connections, pending reviews and unread feedback
    Summary,
    /// Projects and their linked technologies
    Projects(commands::projects::ProjectsArgs),
    /// Technologies (the tags projects link to)
    Technologies(commands::technologies::TechnologiesArgs),
    /// Contact-form submissions
    Connections(commands::connections::ConnectionsArgs),
    /// Visitor feedback
    Feedback(commands::feedback::FeedbackArgs),
    /// Testimonials awaiting or past moderation
    Reviews(commands::reviews::ReviewsArgs),
    /// Portfolio counters
    Stats(commands::stats::StatsArgs),
    /// About-page content: profile, experience, education, certifications, fun facts
    About(commands::about::AboutArgs),
    /// Manage folioctl configuration (init, path, show, validate)
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let loaded = FolioConfig::load();
    let default_level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_setup::init(&TracingConfig {
        debug: cli.debug,
        default_level,
    })
    .ok();

    match run(cli, loaded).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Operation failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, loaded: Result<FolioConfig>) -> Result<()> {
    if let Commands::Config(args) = cli.command {
        return config::run_config(args);
    }

    let mut config = loaded?;
    if let Some(url) = cli.database_url.filter(|url| !url.is_empty()) {
        config.database.url = url;
    }

    if let Commands::Migrate = cli.command {
        let pool = pool::connect(&config.database)
            .await
            .context("failed to connect to database")?;
        pool::migrate(&pool).await.context("failed to run migrations")?;
        info!("migrations applied");
        return Ok(());
    }

    let folio = Folio::connect(&config)
        .await
        .context("failed to connect to database")?;
    let session = Session {
        folio,
        json: cli.json,
    };

    match cli.command {
        Commands::Summary => commands::run_summary(&session).await,
        Commands::Projects(args) => commands::run_projects(&session, args).await,
        Commands::Technologies(args) => commands::run_technologies(&session, args).await,
        Commands::Connections(args) => commands::run_connections(&session, args).await,
        Commands::Feedback(args) => commands::run_feedback(&session, args).await,
        Commands::Reviews(args) => commands::run_reviews(&session, args).await,
        Commands::Stats(args) => commands::run_stats(&session, args).await,
        Commands::About(args) => commands::run_about(&session, args).await,
        Commands::Migrate | Commands::Config(_) => Ok(()),
    }
}
