use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use folio_core::FolioConfig;

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Write a config template to the config path
    Init(InitArgs),
    /// Show config file path
    Path,
    /// Print the effective configuration (file, env overrides, defaults)
    Show,
    /// Parse the config file and report problems
    Validate,
}

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Force overwrite existing config
    #[arg(long, short)]
    pub force: bool,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init(args) => run_init(args),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Show => run_show(),
        ConfigCommands::Validate => run_validate(),
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let config_path = FolioConfig::config_path();

    if config_path.exists() && !args.force {
        return Err(anyhow::anyhow!(
            "Config already exists at {:?}\n\nUse --force to overwrite",
            config_path
        ));
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let template_content = include_str!("../../folio-config.template.toml");
    std::fs::write(&config_path, template_content)
        .context(format!("Failed to write config file: {:?}", config_path))?;

    println!("Created config at: {:?}", config_path);
    println!("\nNext steps:");
    println!("  1. Edit the config: $EDITOR {:?}", config_path);
    println!("  2. Point database.url at your PostgreSQL instance");
    println!("  3. Run: folioctl migrate");

    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", FolioConfig::config_path().display());
    Ok(())
}

fn run_show() -> Result<()> {
    let config = FolioConfig::load()?;
    let toml_str = toml::to_string_pretty(&config).context("Failed to serialize config")?;
    print!("{}", toml_str);
    Ok(())
}

fn run_validate() -> Result<()> {
    let config_path = FolioConfig::config_path();
    if !config_path.exists() {
        println!("No config at {:?}; defaults apply", config_path);
        return Ok(());
    }
    FolioConfig::load_from(&config_path)?;
    println!("Config OK: {:?}", config_path);
    Ok(())
}
