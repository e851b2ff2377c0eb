//! Endpoint commands (configured engines and their load).

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use webbreaker_scheduler::{Endpoint, ProbeOutcome, TierTable};

use crate::output::{print_info, print_output};

use super::CommandContext;

/// Endpoint commands.
#[derive(Debug, Args)]
pub struct EndpointsCommand {
    #[command(subcommand)]
    command: EndpointsSubcommand,
}

#[derive(Debug, Subcommand)]
enum EndpointsSubcommand {
    /// List configured engines.
    List,

    /// Query each engine for its running scans.
    Status(StatusArgs),
}

#[derive(Debug, Args)]
struct StatusArgs {
    /// Only query engines of this size.
    #[arg(long)]
    size: Option<String>,
}

impl EndpointsCommand {
    pub async fn run(self, ctx: CommandContext) -> Result<()> {
        match self.command {
            EndpointsSubcommand::List => list_endpoints(ctx),
            EndpointsSubcommand::Status(args) => endpoint_status(ctx, args).await,
        }
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct EndpointRow {
    #[tabled(rename = "Endpoint")]
    address: String,

    #[tabled(rename = "Max Scans")]
    max_scans: u32,

    #[tabled(rename = "Sizes", display = "display_sizes")]
    sizes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct StatusRow {
    #[tabled(rename = "Endpoint")]
    address: String,

    #[tabled(rename = "Max Scans")]
    max_scans: u32,

    #[tabled(rename = "Running", display = "display_option_usize")]
    running: Option<usize>,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Detail", display = "display_option")]
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn display_sizes(sizes: &[String]) -> String {
    if sizes.is_empty() {
        "-".to_string()
    } else {
        sizes.join(", ")
    }
}

fn display_option(opt: &Option<String>) -> String {
    opt.as_deref().unwrap_or("-").to_string()
}

fn display_option_usize(opt: &Option<usize>) -> String {
    opt.map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn endpoint_row(endpoint: &Endpoint, tiers: &TierTable) -> EndpointRow {
    EndpointRow {
        address: endpoint.address.clone(),
        max_scans: endpoint.max_scans,
        sizes: tiers
            .tiers_for(endpoint.max_scans)
            .into_iter()
            .map(str::to_string)
            .collect(),
    }
}

fn status_row(endpoint: &Endpoint, outcome: &ProbeOutcome) -> StatusRow {
    let detail = match outcome {
        ProbeOutcome::Unreachable(e) => Some(e.to_string()),
        _ => None,
    };
    StatusRow {
        address: endpoint.address.clone(),
        max_scans: endpoint.max_scans,
        running: outcome.running(),
        state: outcome.label().to_string(),
        detail,
    }
}

/// List configured engines.
fn list_endpoints(ctx: CommandContext) -> Result<()> {
    let tiers = ctx.config.webinspect.tier_table();
    let rows: Vec<EndpointRow> = ctx
        .config
        .webinspect
        .endpoints()?
        .iter()
        .map(|endpoint| endpoint_row(endpoint, &tiers))
        .collect();

    print_output(&rows, ctx.format);
    Ok(())
}

/// Probe engines one at a time and report their load.
async fn endpoint_status(ctx: CommandContext, args: StatusArgs) -> Result<()> {
    let filtered = args.size.is_some();
    let scheduler = ctx.scheduler(args.size, None)?;

    let endpoints = if filtered {
        scheduler.candidates()
    } else {
        scheduler.endpoints().to_vec()
    };

    if endpoints.is_empty() && filtered {
        print_info(&format!(
            "No engines are configured for size '{}'.",
            scheduler.tier()
        ));
        return Ok(());
    }

    let mut rows = Vec::with_capacity(endpoints.len());
    for endpoint in &endpoints {
        let outcome = scheduler.probe(endpoint, endpoint.max_scans).await;
        rows.push(status_row(endpoint, &outcome));
    }

    print_output(&rows, ctx.format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use webbreaker_scheduler::QueryError;

    use super::*;

    #[test]
    fn test_endpoint_row_lists_matching_sizes() {
        let tiers = TierTable::default();
        let row = endpoint_row(&Endpoint::new("https://e1:8083", 2), &tiers);
        assert_eq!(row.sizes, vec!["large"]);

        let row = endpoint_row(&Endpoint::new("https://e2:8083", 4), &tiers);
        assert_eq!(display_sizes(&row.sizes), "-");
    }

    #[test]
    fn test_status_row_from_outcomes() {
        let endpoint = Endpoint::new("https://e1:8083", 2);

        let row = status_row(&endpoint, &ProbeOutcome::Saturated { running: 2 });
        assert_eq!(row.state, "full");
        assert_eq!(row.running, Some(2));
        assert_eq!(row.detail, None);

        let row = status_row(
            &endpoint,
            &ProbeOutcome::Unreachable(QueryError::Transport("refused".into())),
        );
        assert_eq!(row.state, "unreachable");
        assert_eq!(display_option_usize(&row.running), "-");
        assert_eq!(row.detail.as_deref(), Some("transport error: refused"));
    }
}
