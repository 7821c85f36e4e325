use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use folio_core::{Connection, ConnectionStatus, ContactForm};

use super::{excerpt, when, Session};

#[derive(Parser, Debug)]
pub struct ConnectionsArgs {
    #[command(subcommand)]
    pub command: ConnectionsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConnectionsCommands {
    /// List contact submissions, newest first
    List {
        /// Only this status (unread, read, replied)
        #[arg(long)]
        status: Option<ConnectionStatus>,
    },
    /// Show a submission and mark it read
    Show { id: String },
    /// Record a reply
    Reply { id: String, message: String },
    /// Submit a contact form (as the public site would)
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
    },
    /// Delete a submission
    Delete { id: String },
}

pub async fn run_connections(session: &Session, args: ConnectionsArgs) -> Result<()> {
    let repo = session.folio.connections();
    match args.command {
        ConnectionsCommands::List { status } => {
            let connections = match status {
                Some(status) => repo.list_by_status(status).await?,
                None => repo.list().await?,
            };
            session.emit(&connections, |connections| {
                for connection in connections {
                    print_line(connection);
                }
            })
        }
        ConnectionsCommands::Show { id } => {
            // first view moves unread to read
            let connection = repo.mark_read(&id).await?;
            session.emit(&connection, print_detail)
        }
        ConnectionsCommands::Reply { id, message } => {
            let connection = repo.reply(&id, &message).await?;
            session.emit(&connection, print_detail)
        }
        ConnectionsCommands::Submit {
            name,
            email,
            subject,
            message,
        } => {
            let connection = repo
                .submit(ContactForm {
                    name,
                    email,
                    subject,
                    message,
                })
                .await
                .context("contact form was not stored")?;
            session.emit(&connection, print_line)
        }
        ConnectionsCommands::Delete { id } => {
            repo.delete(&id).await?;
            println!("Deleted connection {id}");
            Ok(())
        }
    }
}

fn print_line(connection: &Connection) {
    println!(
        "{}  {:<7}  {}  {} <{}>  {}",
        connection.id,
        connection.status.as_str(),
        when(&connection.created_at),
        connection.name,
        connection.email,
        excerpt(&connection.subject, 40)
    );
}

fn print_detail(connection: &Connection) {
    println!("From:    {} <{}>", connection.name, connection.email);
    println!("Subject: {}", connection.subject);
    println!("Date:    {}", when(&connection.created_at));
    println!("Status:  {}", connection.status);
    println!();
    println!("{}", connection.message);
    if let Some(reply) = &connection.reply_message {
        println!();
        println!("Reply:");
        println!("{reply}");
    }
}
