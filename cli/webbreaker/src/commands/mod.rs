//! CLI commands.

mod config;
mod endpoints;
mod scans;
mod select;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use webbreaker_scheduler::{Credentials, EndpointScheduler, SchedulerConfig};

use crate::client::WebInspectClient;
use crate::config::{config_path, Config};
use crate::output::OutputFormat;

/// webbreaker - Schedule scans across a fleet of WebInspect engines.
#[derive(Debug, Parser)]
#[command(name = "webbreaker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    /// Path to the config file.
    #[arg(long, global = true, env = "WEBBREAKER_CONFIG")]
    config: Option<PathBuf>,

    /// WebInspect username.
    #[arg(long, global = true, env = "WEBINSPECT_USERNAME")]
    username: Option<String>,

    /// WebInspect password.
    #[arg(long, global = true, env = "WEBINSPECT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Enable debug logging (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log line format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Log line format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Select a WebInspect engine with spare capacity.
    Select(select::SelectCommand),

    /// Inspect configured WebInspect engines.
    Endpoints(endpoints::EndpointsCommand),

    /// List scans on WebInspect engines.
    Scans(scans::ScansCommand),

    /// Show the effective configuration.
    Config(config::ConfigCommand),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Logging settings requested on the command line.
    pub fn log_settings(&self) -> (bool, LogFormat) {
        (self.verbose, self.log_format)
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let config_path = config_path(self.config.as_deref())?;
        let config = Config::load(&config_path)?;

        let credentials = match (self.username, self.password) {
            (Some(username), Some(password)) => Some(Credentials::new(username, password)),
            (None, None) => None,
            _ => anyhow::bail!("Both --username and --password are required to authenticate"),
        };

        let ctx = CommandContext {
            config,
            config_path,
            credentials,
            format: self.format,
        };

        match self.command {
            Commands::Select(cmd) => cmd.run(ctx).await,
            Commands::Endpoints(cmd) => cmd.run(ctx).await,
            Commands::Scans(cmd) => cmd.run(ctx).await,
            Commands::Config(cmd) => cmd.run(ctx).await,
            Commands::Version => {
                println!("webbreaker {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub config: Config,
    pub config_path: PathBuf,
    pub credentials: Option<Credentials>,
    pub format: OutputFormat,
}

impl CommandContext {
    /// Build a scheduler over the configured endpoint pool.
    pub fn scheduler(
        &self,
        size: Option<String>,
        seed: Option<u64>,
    ) -> Result<EndpointScheduler<WebInspectClient>> {
        let webinspect = &self.config.webinspect;
        let client = WebInspectClient::new(webinspect)?;

        let config = SchedulerConfig {
            endpoints: webinspect.endpoints()?,
            tiers: webinspect.tier_table(),
            requested_tier: size,
            credentials: self.credentials.clone(),
        };

        // Probe bound sits just past the HTTP timeout.
        let mut builder = EndpointScheduler::builder(config, client)
            .probe_timeout(webinspect.request_timeout() + Duration::from_secs(1));
        if let Some(seed) = seed {
            builder = builder.seed(seed);
        }

        Ok(builder.build())
    }
}
