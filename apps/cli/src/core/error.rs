use std::path::PathBuf;
use thiserror::Error;
use workflow_architect::domain::VerificationError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Registry error in {}: {reason}", path.display())]
    Registry { path: PathBuf, reason: String },

    #[error(transparent)]
    Verification(#[from] VerificationError),
}

impl CliError {
    /// Returns a themed, actionable suggestion for the error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            CliError::Config(_) => Some(
                "Check workflow-architect.toml and the WORKFLOW_ARCHITECT_* environment variables."
                    .to_string(),
            ),
            CliError::Registry { .. } => Some(
                "Registry files must be .json, .toml, .yaml or .yml and match the registry schema."
                    .to_string(),
            ),
            CliError::Verification(_) => Some(
                "Run `workflow-architect discover --write-registry` to refresh pins, then fix the entries listed above."
                    .to_string(),
            ),
        }
    }

    pub fn render(&self) {
        eprintln!("\n{} {}", console::style("Error:").red().bold(), self);
        if let Some(s) = self.suggestion() {
            eprintln!("{} {}", console::style("  help:").dim(), s);
        }
    }
}
