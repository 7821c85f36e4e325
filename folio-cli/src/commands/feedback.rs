use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use folio_core::{Feedback, FeedbackKind, FeedbackStatus, FeedbackWithSender, NewFeedback, Priority};

use super::{excerpt, when, Session};

#[derive(Parser, Debug)]
pub struct FeedbackArgs {
    #[command(subcommand)]
    pub command: FeedbackCommands,
}

#[derive(Subcommand, Debug)]
pub enum FeedbackCommands {
    /// List feedback with sender details, newest first
    List,
    /// Show one feedback entry
    Show { id: String },
    /// Set status to read or unread
    Status { id: String, status: FeedbackStatus },
    /// Reply and mark replied
    Reply { id: String, message: String },
    /// Submit feedback
    Submit {
        /// feedback, complaint or suggestion
        #[arg(long = "type", default_value = "feedback")]
        kind: FeedbackKind,
        #[arg(long)]
        content: String,
        #[arg(long)]
        priority: Option<Priority>,
        /// Connection identifying the sender
        #[arg(long)]
        connection: Option<String>,
    },
    /// Delete a feedback entry
    Delete { id: String },
}

pub async fn run_feedback(session: &Session, args: FeedbackArgs) -> Result<()> {
    let repo = session.folio.feedback();
    match args.command {
        FeedbackCommands::List => {
            let entries = repo.list_with_sender().await?;
            session.emit(&entries, |entries| {
                for entry in entries {
                    print_line(entry);
                }
            })
        }
        FeedbackCommands::Show { id } => {
            let feedback = repo
                .get_by_id(&id)
                .await?
                .with_context(|| format!("feedback '{id}' not found"))?;
            session.emit(&feedback, print_detail)
        }
        FeedbackCommands::Status { id, status } => {
            let feedback = repo.set_status(&id, status).await?;
            session.emit(&feedback, print_detail)
        }
        FeedbackCommands::Reply { id, message } => {
            let feedback = repo.reply(&id, &message).await?;
            session.emit(&feedback, print_detail)
        }
        FeedbackCommands::Submit {
            kind,
            content,
            priority,
            connection,
        } => {
            let feedback = repo
                .submit(NewFeedback {
                    kind,
                    content,
                    priority,
                    connection_id: connection,
                })
                .await?;
            session.emit(&feedback, print_detail)
        }
        FeedbackCommands::Delete { id } => {
            repo.delete(&id).await?;
            println!("Deleted feedback {id}");
            Ok(())
        }
    }
}

fn print_line(entry: &FeedbackWithSender) {
    let f = &entry.feedback;
    let sender = entry
        .sender
        .as_ref()
        .map(|s| format!("{} <{}>", s.name, s.email))
        .unwrap_or_else(|| "anonymous".to_string());
    println!(
        "{}  {:<7}  {:<10}  {}  {}  {}",
        f.id,
        f.status.as_str(),
        f.kind.as_str(),
        when(&f.created_at),
        sender,
        excerpt(&f.content, 40)
    );
}

fn print_detail(feedback: &Feedback) {
    println!("{} ({})", feedback.kind.as_str(), feedback.id);
    println!("Status:   {}", feedback.status);
    if let Some(priority) = feedback.priority {
        println!("Priority: {priority:?}");
    }
    println!("Date:     {}", when(&feedback.created_at));
    println!();
    println!("{}", feedback.content);
    if let Some(reply) = &feedback.reply_message {
        println!();
        println!("Reply:");
        println!("{reply}");
    }
}
