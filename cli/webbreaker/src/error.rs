//! Error handling and display for the CLI.

use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No WebInspect engine is available for size '{tier}'")]
    NoEndpointAvailable { tier: String },

    #[error("Error identifying an appropriate WebInspect scan engine: {0}")]
    SelectionFailed(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    // Check for specific error types and provide hints
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        match cli_err {
            CliError::Config(_) => {
                eprintln!(
                    "\n{}",
                    "Hint: Run `webbreaker config path` to locate the config file.".yellow()
                );
            }
            CliError::NoEndpointAvailable { .. } => {
                eprintln!(
                    "\n{}",
                    "Hint: Every engine of this size is busy or unreachable. Run `webbreaker endpoints status` for details."
                        .yellow()
                );
            }
            _ => {}
        }
    }
}
