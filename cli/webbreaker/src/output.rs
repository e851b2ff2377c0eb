//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

const CLI_SCHEMA_VERSION: &str = "webbreaker.cli.v1";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Print data in the specified format.
pub fn print_output<T: Serialize + Tabled>(data: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if data.is_empty() {
                println!("{}", "No items found.".dimmed());
            } else {
                let table = Table::new(data).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = format_json(data, "[]");
            println!("{}", json);
        }
    }
}

/// Print a single item as JSON.
pub fn print_single<T: Serialize>(data: &T) {
    println!("{}", format_json(data, "{}"));
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

fn format_json<T: Serialize + ?Sized>(data: &T, fallback: &str) -> String {
    let value = serde_json::to_value(data).unwrap_or_else(|_| serde_json::json!({}));
    serde_json::to_string_pretty(&wrap_with_schema(value))
        .unwrap_or_else(|_| fallback.to_string())
}

fn wrap_with_schema(value: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "schemaVersion": CLI_SCHEMA_VERSION,
        "data": value
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_json_wraps_with_sorted_keys() {
        let data = serde_json::json!({"zeta": 1, "alpha": {"b": 2, "a": 1}});
        let out = format_json(&data, "{}");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["schemaVersion"], CLI_SCHEMA_VERSION);
        assert_eq!(value["data"]["alpha"]["a"], 1);

        let alpha = out.find("\"alpha\"").unwrap();
        let zeta = out.find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
    }

    #[test]
    fn format_json_handles_lists() {
        let out = format_json(&vec!["a", "b"], "[]");
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["data"], serde_json::json!(["a", "b"]));
    }
}
