use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use folio_core::{NewProject, ProjectPatch, ProjectWithTechnologies};

use super::Session;

#[derive(Parser, Debug)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub command: ProjectsCommands,
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// List projects by sort order
    List {
        /// Only featured projects
        #[arg(long)]
        featured: bool,
    },
    /// Show one project with its technologies
    Show { id: String },
    /// Create a project
    Create(CreateArgs),
    /// Update fields and optionally replace linked technologies
    Update(UpdateArgs),
    /// Delete a project and its technology links
    Delete { id: String },
}

#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: String,
    #[arg(long)]
    pub image_url: Option<String>,
    #[arg(long)]
    pub live_url: Option<String>,
    #[arg(long)]
    pub repo_url: Option<String>,
    #[arg(long)]
    pub featured: bool,
    #[arg(long, default_value_t = 0)]
    pub sort_order: i32,
    /// Technology id to link (repeatable)
    #[arg(long = "tech", value_name = "ID")]
    pub technologies: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct UpdateArgs {
    pub id: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub image_url: Option<String>,
    #[arg(long)]
    pub live_url: Option<String>,
    #[arg(long)]
    pub repo_url: Option<String>,
    #[arg(long)]
    pub featured: Option<bool>,
    #[arg(long)]
    pub sort_order: Option<i32>,
    /// Replace linked technologies with these ids (repeatable)
    #[arg(long = "tech", value_name = "ID", conflicts_with = "clear_tech")]
    pub technologies: Vec<String>,
    /// Unlink every technology
    #[arg(long)]
    pub clear_tech: bool,
}

pub async fn run_projects(session: &Session, args: ProjectsArgs) -> Result<()> {
    let repo = session.folio.projects();
    match args.command {
        ProjectsCommands::List { featured } => {
            let projects = if featured {
                repo.list_featured().await?
            } else {
                repo.list_all().await?
            };
            session.emit(&projects, |projects| {
                for project in projects {
                    print_line(project);
                }
            })
        }
        ProjectsCommands::Show { id } => {
            let project = repo
                .get_by_id(&id)
                .await?
                .with_context(|| format!("project '{id}' not found"))?;
            session.emit(&project, print_detail)
        }
        ProjectsCommands::Create(args) => {
            let project = NewProject {
                title: args.title,
                description: args.description,
                image_url: args.image_url,
                live_url: args.live_url,
                repo_url: args.repo_url,
                is_featured: args.featured,
                sort_order: args.sort_order,
                ..NewProject::default()
            };
            let created = repo.create(project, &args.technologies).await?;
            session.emit(&created, print_detail)
        }
        ProjectsCommands::Update(args) => {
            let patch = ProjectPatch {
                title: args.title,
                description: args.description,
                image_url: args.image_url.map(Some),
                live_url: args.live_url.map(Some),
                repo_url: args.repo_url.map(Some),
                is_featured: args.featured,
                sort_order: args.sort_order,
                ..ProjectPatch::default()
            };
            let technology_ids = if args.clear_tech {
                Some(&[][..])
            } else if args.technologies.is_empty() {
                None
            } else {
                Some(args.technologies.as_slice())
            };
            let updated = repo.update(&args.id, patch, technology_ids).await?;
            session.emit(&updated, print_detail)
        }
        ProjectsCommands::Delete { id } => {
            repo.delete(&id).await?;
            println!("Deleted project {id}");
            Ok(())
        }
    }
}

fn technology_names(project: &ProjectWithTechnologies) -> String {
    project
        .technologies
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_line(project: &ProjectWithTechnologies) {
    let p = &project.project;
    println!(
        "{:>4}  {}  {}{}  [{}]",
        p.sort_order,
        p.id,
        p.title,
        if p.is_featured { " *" } else { "" },
        technology_names(project)
    );
}

fn print_detail(project: &ProjectWithTechnologies) {
    let p = &project.project;
    println!("{} ({})", p.title, p.id);
    println!("  {}", p.description);
    if let Some(link) = p.live_link() {
        println!("  live:  {link}");
    }
    if let Some(link) = p.repo_link() {
        println!("  repo:  {link}");
    }
    println!("  featured: {}  sort order: {}", p.is_featured, p.sort_order);
    println!("  technologies: {}", technology_names(project));
}
