use anyhow::Result;
use clap::{Parser, Subcommand};

use folio_db::AboutPage;

use super::{excerpt, Session};

#[derive(Parser, Debug)]
pub struct AboutArgs {
    #[command(subcommand)]
    pub command: Option<AboutCommands>,
}

#[derive(Subcommand, Debug)]
pub enum AboutCommands {
    /// Every section (default)
    Show,
    /// Profile only
    Profile,
    /// Work history with technologies
    Experience,
    /// Education history
    Education,
    /// Active certifications
    Certifications,
    /// Fun facts by category
    Facts,
}

pub async fn run_about(session: &Session, args: AboutArgs) -> Result<()> {
    let repo = session.folio.about();
    match args.command.unwrap_or(AboutCommands::Show) {
        AboutCommands::Show => {
            let page = repo.page().await?;
            session.emit(&page, print_page)
        }
        AboutCommands::Profile => {
            let profile = repo.profile().await?;
            session.emit(&profile, |profile| match profile {
                Some(p) => {
                    println!("{}", p.full_name);
                    if let Some(headline) = &p.headline {
                        println!("{headline}");
                    }
                }
                None => println!("No profile yet."),
            })
        }
        AboutCommands::Experience => {
            let experiences = repo.experiences().await?;
            session.emit(&experiences, |experiences| {
                for e in experiences {
                    let tech: Vec<_> = e.technologies.iter().map(|t| t.name.as_str()).collect();
                    println!(
                        "{:<20} {:<24} {:<22} {}",
                        excerpt(&e.experience.company, 20),
                        excerpt(&e.experience.position, 24),
                        e.experience.period().to_string(),
                        tech.join(", ")
                    );
                }
            })
        }
        AboutCommands::Education => {
            let education = repo.education().await?;
            session.emit(&education, |education| {
                for e in education {
                    println!("{:<28} {:<16} {}", excerpt(&e.institution, 28), e.degree, e.period());
                }
            })
        }
        AboutCommands::Certifications => {
            let certifications = repo.certifications().await?;
            session.emit(&certifications, |certifications| {
                for c in certifications {
                    println!("{:<32} {}", excerpt(&c.name, 32), c.issuer);
                }
            })
        }
        AboutCommands::Facts => {
            let facts = repo.fun_facts_by_category().await?;
            session.emit(&facts, |groups| {
                for group in groups {
                    println!("{}", group.category);
                    for fact in &group.items {
                        println!("  - {}", excerpt(&fact.content, 70));
                    }
                }
            })
        }
    }
}

fn print_page(page: &AboutPage) {
    match &page.profile {
        Some(p) => println!("{}", p.full_name),
        None => println!("No profile yet."),
    }
    println!("experience      {}", page.experiences.len());
    println!("education       {}", page.education.len());
    println!("certifications  {}", page.certifications.len());
    let facts: usize = page.fun_facts.iter().map(|g| g.items.len()).sum();
    println!("fun facts       {facts} in {} categories", page.fun_facts.len());
}
