use super::config::cmd_config;
use super::env::CliArgs;
use super::interact::{cmd_click, cmd_select, cmd_type};
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Click(args) => cmd_click(args, ctx).await,
        Commands::Type(args) => cmd_type(args, ctx).await,
        Commands::Select(args) => cmd_select(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
    }
}
