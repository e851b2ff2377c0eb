//! Config commands (effective configuration and its location).

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::config::WebInspectConfig;
use crate::output::{print_single, OutputFormat};

use super::CommandContext;

/// Show the effective configuration.
#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
enum ConfigSubcommand {
    /// Show the configuration in effect (file values merged with defaults).
    Show,

    /// Print the config file location.
    Path,
}

#[derive(Debug, Serialize)]
struct ConfigView<'a> {
    path: String,
    exists: bool,
    username: Option<&'a str>,
    webinspect: &'a WebInspectConfig,
}

impl ConfigCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => show(&ctx),
            ConfigSubcommand::Path => path(&ctx),
        }
    }
}

fn show(ctx: &CommandContext) -> Result<()> {
    // Surface size references that do not resolve.
    ctx.config.webinspect.endpoints()?;

    match ctx.format {
        OutputFormat::Json => print_single(&ConfigView {
            path: ctx.config_path.display().to_string(),
            exists: ctx.config_path.exists(),
            username: ctx.credentials.as_ref().map(|c| c.username.as_str()),
            webinspect: &ctx.config.webinspect,
        }),
        OutputFormat::Table => {
            println!("# {}", ctx.config_path.display());
            if let Some(creds) = &ctx.credentials {
                println!("# authenticating as {}", creds.username);
            }
            print!("{}", ctx.config.to_toml()?);
        }
    }
    Ok(())
}

fn path(ctx: &CommandContext) -> Result<()> {
    match ctx.format {
        OutputFormat::Json => print_single(&serde_json::json!({
            "path": ctx.config_path.display().to_string(),
            "exists": ctx.config_path.exists(),
        })),
        OutputFormat::Table => println!("{}", ctx.config_path.display()),
    }
    Ok(())
}
