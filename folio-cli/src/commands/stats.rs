use anyhow::Result;
use clap::{Parser, Subcommand};

use super::Session;

#[derive(Parser, Debug)]
pub struct StatsArgs {
    #[command(subcommand)]
    pub command: Option<StatsCommands>,
}

#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    /// Show every counter (default)
    Show,
    /// Add to a counter, creating it if needed
    Increment {
        metric_name: String,
        #[arg(long, default_value_t = 1)]
        by: i64,
    },
}

pub async fn run_stats(session: &Session, args: StatsArgs) -> Result<()> {
    let repo = session.folio.stats();
    match args.command.unwrap_or(StatsCommands::Show) {
        StatsCommands::Show => {
            let stats = repo.all().await?;
            session.emit(&stats, |stats| {
                for (name, value) in stats {
                    println!("{name:<24} {value}");
                }
            })
        }
        StatsCommands::Increment { metric_name, by } => {
            let value = repo.increment(&metric_name, by).await?;
            println!("{metric_name:<24} {value}");
            Ok(())
        }
    }
}

/// Admin landing-page counts
pub async fn run_summary(session: &Session) -> Result<()> {
    let summary = session.folio.dashboard().await?;
    session.emit(&summary, |s| {
        println!("projects            {}", s.projects);
        println!("unread connections  {}", s.unread_connections);
        println!("pending reviews     {}", s.pending_reviews);
        println!("unread feedback     {}", s.unread_feedback);
        for (name, value) in &s.stats {
            println!("{name:<19} {value}");
        }
    })
}
