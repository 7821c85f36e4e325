use anyhow::Result;
use clap::{Parser, Subcommand};

use folio_core::{Review, ReviewStatus};

use super::{excerpt, when, Session};

#[derive(Parser, Debug)]
pub struct ReviewsArgs {
    #[command(subcommand)]
    pub command: ReviewsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ReviewsCommands {
    /// List reviews, newest first (default: pending)
    List {
        /// pending, approved or rejected
        #[arg(long, default_value = "pending")]
        status: ReviewStatus,
        /// Every review regardless of status
        #[arg(long, conflicts_with = "status")]
        all: bool,
    },
    /// Publish a pending review
    Approve { id: String },
    /// Reject a pending review (kept for the record)
    Reject { id: String },
    /// Delete a review
    Delete { id: String },
}

pub async fn run_reviews(session: &Session, args: ReviewsArgs) -> Result<()> {
    let repo = session.folio.reviews();
    match args.command {
        ReviewsCommands::List { status, all } => {
            let reviews = if all {
                repo.list().await?
            } else {
                repo.list_by_status(status).await?
            };
            session.emit(&reviews, |reviews| {
                for review in reviews {
                    print_line(review);
                }
            })
        }
        ReviewsCommands::Approve { id } => {
            let review = repo.approve(&id).await?;
            session.emit(&review, print_line)
        }
        ReviewsCommands::Reject { id } => {
            let review = repo.reject(&id).await?;
            session.emit(&review, print_line)
        }
        ReviewsCommands::Delete { id } => {
            repo.delete(&id).await?;
            println!("Deleted review {id}");
            Ok(())
        }
    }
}

fn print_line(review: &Review) {
    let stars = review
        .rating
        .map(|r| "*".repeat(r.clamp(0, 5) as usize))
        .unwrap_or_default();
    let byline = match &review.company {
        Some(company) => format!("{}, {} at {}", review.name, review.role, company),
        None => format!("{}, {}", review.name, review.role),
    };
    println!(
        "{}  {:<8}  {}  {:<5}  {}  {}",
        review.id,
        review.status.as_str(),
        when(&review.created_at),
        stars,
        byline,
        excerpt(&review.content, 40)
    );
}
