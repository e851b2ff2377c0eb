//! Engine selection.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use webbreaker_scheduler::Selection;

use crate::error::CliError;
use crate::output::{print_single, OutputFormat};

use super::CommandContext;

/// Select a WebInspect engine with spare capacity.
///
/// Prints the engine's URL on success. Exits non-zero when no engine of the
/// requested size has headroom.
#[derive(Debug, Args)]
pub struct SelectCommand {
    /// Scan size to select an engine for (defaults to the configured default size).
    #[arg(long, env = "WEBBREAKER_WEBINSPECT_SIZE")]
    size: Option<String>,

    /// Seed the candidate shuffle for a reproducible choice.
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SelectionView {
    endpoint: String,
    size: String,
    max_scans: u32,
}

impl SelectCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        let selection = self.select(&ctx).await?;
        match ctx.format {
            OutputFormat::Json => print_single(&selection),
            OutputFormat::Table => println!("{}", selection.endpoint),
        }
        Ok(())
    }

    async fn select(self, ctx: &CommandContext) -> Result<SelectionView> {
        let scheduler = ctx.scheduler(self.size, self.seed)?;

        match scheduler.select_endpoint().await {
            Selection::Selected(endpoint) => Ok(SelectionView {
                endpoint: endpoint.address,
                size: scheduler.tier().to_string(),
                max_scans: endpoint.max_scans,
            }),
            Selection::NoneAvailable => Err(CliError::NoEndpointAvailable {
                tier: scheduler.tier().to_string(),
            }
            .into()),
            Selection::Failed(reason) => Err(CliError::SelectionFailed(reason).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::Config;

    const SCANS_PATH: &str = "/webinspect/scanner/scans";

    async fn engine_running(count: usize) -> MockServer {
        let scans: Vec<_> = (0..count)
            .map(|i| serde_json::json!({"ID": format!("scan-{i}"), "Status": "Running"}))
            .collect();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCANS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(scans))
            .mount(&server)
            .await;
        server
    }

    fn context(config: &str) -> CommandContext {
        CommandContext {
            config: Config::parse(config).unwrap(),
            config_path: PathBuf::from("config.toml"),
            credentials: None,
            format: OutputFormat::Table,
        }
    }

    fn pool(engines: &[(&MockServer, &str)]) -> String {
        let mut config = String::from("[webinspect]\nrequest_timeout_secs = 5\n");
        for (engine, size) in engines {
            config.push_str(&format!(
                "\n[[webinspect.endpoints]]\nurl = \"{}\"\nsize = {}\n",
                engine.uri(),
                size
            ));
        }
        config
    }

    #[tokio::test]
    async fn test_selects_engine_with_headroom() {
        let busy = engine_running(2).await;
        let idle = engine_running(1).await;
        let ctx = context(&pool(&[(&busy, "\"large\""), (&idle, "\"large\"")]));

        for seed in 0..4 {
            let cmd = SelectCommand {
                size: Some("large".to_string()),
                seed: Some(seed),
            };
            let selection = cmd.select(&ctx).await.unwrap();
            assert_eq!(selection.endpoint, idle.uri());
            assert_eq!(selection.size, "large");
            assert_eq!(selection.max_scans, 2);
        }

        let cmd = SelectCommand {
            size: None,
            seed: Some(7),
        };
        assert!(cmd.run(ctx).await.is_ok());
    }

    #[tokio::test]
    async fn test_saturated_pool_is_no_endpoint_available() {
        let first = engine_running(1).await;
        let second = engine_running(3).await;
        let ctx = context(&pool(&[(&first, "\"medium\""), (&second, "\"medium\"")]));

        let cmd = SelectCommand {
            size: Some("medium".to_string()),
            seed: Some(1),
        };
        let err = cmd.run(ctx).await.unwrap_err();

        match err.downcast_ref::<CliError>() {
            Some(CliError::NoEndpointAvailable { tier }) => assert_eq!(tier, "medium"),
            other => panic!("expected NoEndpointAvailable, got {other:?}"),
        }
        assert_eq!(first.received_requests().await.unwrap().len(), 1);
        assert_eq!(second.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_limit_size_is_selection_failure() {
        let engine = engine_running(0).await;
        let config = format!("{}\n[webinspect.sizes]\noff = 0\n", pool(&[(&engine, "0")]));
        let ctx = context(&config);

        let cmd = SelectCommand {
            size: Some("off".to_string()),
            seed: None,
        };
        let err = cmd.run(ctx).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::SelectionFailed(reason)) if reason.contains("zero concurrent scans")
        ));
        assert!(engine.received_requests().await.unwrap().is_empty());
    }
}
