use crate::cli::context::CliContext;
use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use frameweave_cli::AppConfig;
use tokio::fs;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration (file plus environment overrides)
    Show,

    /// Validate the configuration file and environment overrides
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path().to_path_buf();
    match args.action {
        ConfigAction::Show => {
            println!("Effective configuration ({}):", path.display());
            println!("{}", serde_yaml::to_string(ctx.config())?);
        }
        ConfigAction::Validate => {
            let mut config = if fs::try_exists(&path).await? {
                AppConfig::load_from(&path)
                    .with_context(|| format!("parsing {}", path.display()))?
            } else {
                println!("No configuration file at {}; checking defaults", path.display());
                AppConfig::default()
            };
            config
                .apply_process_env()
                .context("environment overrides")?;
            config.validate()?;
            println!("Configuration is valid");
        }
    }

    Ok(())
}
