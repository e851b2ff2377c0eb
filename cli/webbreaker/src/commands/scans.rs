//! Scan commands (scans running or finished on an engine).

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use tracing::error;
use webbreaker_scheduler::{Credentials, ScanStatusSource, ScanSummary};

use crate::client::WebInspectClient;
use crate::error::CliError;
use crate::output::{print_info, print_output, print_single, OutputFormat};

use super::CommandContext;

/// Scan commands.
#[derive(Debug, Args)]
pub struct ScansCommand {
    #[command(subcommand)]
    command: ScansSubcommand,
}

#[derive(Debug, Subcommand)]
enum ScansSubcommand {
    /// List scans on one or more engines.
    List(ListArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Engine URL to query (repeatable, defaults to every configured engine).
    #[arg(long = "server")]
    servers: Vec<String>,

    /// Only show scans with exactly this name.
    #[arg(long)]
    name: Option<String>,
}

impl ScansCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            ScansSubcommand::List(args) => list_scans(ctx, args).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
struct ScanRow {
    #[tabled(rename = "ID", display = "display_option")]
    id: Option<String>,

    #[tabled(rename = "Name", display = "display_option")]
    name: Option<String>,

    #[tabled(rename = "Status")]
    status: String,
}

impl From<ScanSummary> for ScanRow {
    fn from(scan: ScanSummary) -> Self {
        Self {
            id: scan.id,
            name: scan.name,
            status: scan.status,
        }
    }
}

/// Scans listed on one engine.
#[derive(Debug, Serialize)]
struct ServerScans {
    server: String,
    scans: Vec<ScanRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn display_option(opt: &Option<String>) -> String {
    opt.as_deref().unwrap_or("-").to_string()
}

/// Query each server in turn, keeping scans named `name` when given.
///
/// A failed query is recorded against its server and does not stop the rest.
async fn collect_scans<S: ScanStatusSource>(
    source: &S,
    servers: &[String],
    credentials: Option<&Credentials>,
    name: Option<&str>,
) -> Vec<ServerScans> {
    let mut results = Vec::with_capacity(servers.len());
    for server in servers {
        let (scans, error) = match source.list_scans(server, credentials).await {
            Ok(snapshot) if snapshot.success => {
                let scans = snapshot
                    .scans
                    .into_iter()
                    .filter(|scan| name.is_none() || scan.name.as_deref() == name)
                    .map(ScanRow::from)
                    .collect();
                (scans, None)
            }
            Ok(_) => (Vec::new(), Some("request was rejected".to_string())),
            Err(e) => (Vec::new(), Some(e.to_string())),
        };
        results.push(ServerScans {
            server: server.clone(),
            scans,
            error,
        });
    }
    results
}

fn name_match_message(name: &str, server: &str, found: bool) -> String {
    if found {
        format!("Scans matching the name {name} found on {server}")
    } else {
        format!("No scans matching the name {name} were found on {server}")
    }
}

/// Print each server's scans; fails if any server could not be queried.
fn report(results: &[ServerScans], name: Option<&str>, format: OutputFormat) -> Result<()> {
    for result in results {
        if let Some(e) = &result.error {
            error!(
                server = %result.server,
                error = %e,
                "Failed to list scans on {}",
                result.server
            );
            continue;
        }

        if let Some(name) = name {
            if result.scans.is_empty() {
                error!("{}", name_match_message(name, &result.server, false));
                continue;
            }
            if format == OutputFormat::Table {
                print_info(&name_match_message(name, &result.server, true));
            }
        } else if format == OutputFormat::Table {
            print_info(&format!("Scans on {}", result.server));
        }

        if format == OutputFormat::Table {
            print_output(&result.scans, format);
        }
    }

    if format == OutputFormat::Json {
        print_single(&results);
    }

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        anyhow::bail!(
            "Failed to list scans on {} of {} WebInspect server(s)",
            failed,
            results.len()
        );
    }
    Ok(())
}

/// List scans on the requested servers, or on every configured engine.
async fn list_scans(ctx: CommandContext, args: ListArgs) -> Result<()> {
    let servers = if args.servers.is_empty() {
        ctx.config
            .webinspect
            .endpoints()?
            .into_iter()
            .map(|endpoint| endpoint.address)
            .collect()
    } else {
        args.servers
    };

    if servers.is_empty() {
        return Err(CliError::Config(
            "no WebInspect engines are configured; pass --server".to_string(),
        )
        .into());
    }

    let client = WebInspectClient::new(&ctx.config.webinspect)?;
    let results = collect_scans(
        &client,
        &servers,
        ctx.credentials.as_ref(),
        args.name.as_deref(),
    )
    .await;

    report(&results, args.name.as_deref(), ctx.format)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::{Config, WebInspectConfig};

    const SCANS_PATH: &str = "/webinspect/scanner/scans";

    fn client() -> WebInspectClient {
        WebInspectClient::new(&WebInspectConfig {
            request_timeout_secs: 5,
            ..WebInspectConfig::default()
        })
        .unwrap()
    }

    async fn engine_with(scans: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCANS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(scans))
            .mount(&server)
            .await;
        server
    }

    fn nightly_and_weekly() -> serde_json::Value {
        serde_json::json!([
            {"ID": "a1", "Name": "nightly", "Status": "Running"},
            {"ID": "b2", "Name": "weekly", "Status": "Complete"},
            {"ID": "c3", "Name": "nightly", "Status": "Complete"}
        ])
    }

    #[tokio::test]
    async fn test_lists_every_scan_without_name() {
        let engine = engine_with(nightly_and_weekly()).await;

        let results = collect_scans(&client(), &[engine.uri()], None, None).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].scans.len(), 3);
        assert_eq!(results[0].error, None);
        assert!(report(&results, None, OutputFormat::Table).is_ok());
    }

    #[tokio::test]
    async fn test_name_match_on_each_server() {
        let first = engine_with(nightly_and_weekly()).await;
        let second = engine_with(serde_json::json!([
            {"ID": "d4", "Name": "nightly", "Status": "Interrupted"}
        ]))
        .await;

        let servers = [first.uri(), second.uri()];
        let results = collect_scans(&client(), &servers, None, Some("nightly")).await;

        let ids: Vec<Vec<Option<&str>>> = results
            .iter()
            .map(|r| r.scans.iter().map(|s| s.id.as_deref()).collect())
            .collect();
        assert_eq!(ids, vec![vec![Some("a1"), Some("c3")], vec![Some("d4")]]);
        assert_eq!(
            name_match_message("nightly", &results[1].server, true),
            format!("Scans matching the name nightly found on {}", second.uri())
        );
        assert!(report(&results, Some("nightly"), OutputFormat::Table).is_ok());
    }

    #[tokio::test]
    async fn test_name_without_match_is_not_a_failure() {
        let engine = engine_with(nightly_and_weekly()).await;

        let results = collect_scans(&client(), &[engine.uri()], None, Some("Nightly")).await;

        assert!(results[0].scans.is_empty());
        assert_eq!(results[0].error, None);
        assert_eq!(
            name_match_message("Nightly", &results[0].server, false),
            format!("No scans matching the name Nightly were found on {}", engine.uri())
        );
        assert!(report(&results, Some("Nightly"), OutputFormat::Table).is_ok());
    }

    #[tokio::test]
    async fn test_failed_server_is_reported_and_others_listed() {
        let engine = engine_with(nightly_and_weekly()).await;
        let rejecting = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCANS_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&rejecting)
            .await;

        let servers = [rejecting.uri(), engine.uri()];
        let results = collect_scans(&client(), &servers, None, None).await;

        assert_eq!(results[0].error.as_deref(), Some("request was rejected"));
        assert_eq!(results[1].scans.len(), 3);

        let err = report(&results, None, OutputFormat::Json).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }

    #[tokio::test]
    async fn test_defaults_to_configured_engines() {
        let engine = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SCANS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(nightly_and_weekly()))
            .expect(1)
            .mount(&engine)
            .await;

        let config = Config::parse(&format!(
            r#"
[[webinspect.endpoints]]
url = "{}"
size = "large"
"#,
            engine.uri()
        ))
        .unwrap();
        let ctx = CommandContext {
            config,
            config_path: PathBuf::from("config.toml"),
            credentials: None,
            format: OutputFormat::Json,
        };
        let args = ListArgs {
            servers: Vec::new(),
            name: Some("weekly".to_string()),
        };

        list_scans(ctx, args).await.unwrap();
    }

    #[tokio::test]
    async fn test_no_servers_is_config_error() {
        let ctx = CommandContext {
            config: Config::default(),
            config_path: PathBuf::from("config.toml"),
            credentials: None,
            format: OutputFormat::Table,
        };
        let args = ListArgs {
            servers: Vec::new(),
            name: None,
        };

        let err = list_scans(ctx, args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::Config(_))
        ));
    }
}
