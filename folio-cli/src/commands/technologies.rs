use anyhow::Result;
use clap::{Parser, Subcommand};

use folio_core::{NewTechnology, Technology, TechnologyPatch};

use super::Session;

#[derive(Parser, Debug)]
pub struct TechnologiesArgs {
    #[command(subcommand)]
    pub command: TechnologiesCommands,
}

#[derive(Subcommand, Debug)]
pub enum TechnologiesCommands {
    /// List technologies by name
    List {
        /// Group by category
        #[arg(long)]
        by_category: bool,
    },
    /// Add a technology
    Create {
        name: String,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Rename or recategorize a technology
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        icon: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a technology, unlinking it from every project
    Delete { id: String },
}

pub async fn run_technologies(session: &Session, args: TechnologiesArgs) -> Result<()> {
    let repo = session.folio.technologies();
    match args.command {
        TechnologiesCommands::List { by_category: true } => {
            let groups = repo.list_by_category().await?;
            session.emit(&groups, |groups| {
                for group in groups {
                    println!("{}", group.category);
                    for tech in &group.technologies {
                        println!("  {}  {}", tech.id, tech.name);
                    }
                }
            })
        }
        TechnologiesCommands::List { by_category: false } => {
            let technologies = repo.list().await?;
            session.emit(&technologies, |technologies| {
                for tech in technologies {
                    print_line(tech);
                }
            })
        }
        TechnologiesCommands::Create {
            name,
            icon,
            category,
        } => {
            let technology = NewTechnology {
                name,
                icon_name: icon,
                category,
            };
            let created = repo.create(technology).await?;
            session.emit(&created, print_line)
        }
        TechnologiesCommands::Update {
            id,
            name,
            icon,
            category,
        } => {
            let patch = TechnologyPatch {
                name,
                icon_name: icon.map(Some),
                category: category.map(Some),
            };
            let updated = repo.update(&id, patch).await?;
            session.emit(&updated, print_line)
        }
        TechnologiesCommands::Delete { id } => {
            repo.delete(&id).await?;
            println!("Deleted technology {id}");
            Ok(())
        }
    }
}

fn print_line(tech: &Technology) {
    println!(
        "{}  {}  ({})",
        tech.id,
        tech.name,
        tech.category.as_deref().unwrap_or("-")
    );
}
