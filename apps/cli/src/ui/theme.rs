use owo_colors::OwoColorize;
use std::fmt;

/// Colour palette for the workflow-architect CLI.
pub struct Theme;

impl Theme {
    /// Structure: headings, identifiers.
    pub fn primary(text: impl fmt::Display) -> String {
        format!("{}", text.cyan().bold())
    }

    pub fn bold(text: impl fmt::Display) -> String {
        format!("{}", text.bold())
    }

    pub fn success(text: impl fmt::Display) -> String {
        format!("{}", text.green().bold())
    }

    pub fn error(text: impl fmt::Display) -> String {
        format!("{}", text.red().bold())
    }

    /// Metadata, paths, counts.
    pub fn muted(text: impl fmt::Display) -> String {
        format!("{}", text.dimmed())
    }
}

/// Usage: `println!("{} Wrote Dockerfile", Icon::File)`
pub enum Icon {
    Check,
    Cross,
    Package,
    Download,
    File,
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self {
            Icon::Check => "✔",
            Icon::Cross => "✖",
            Icon::Package => "📦",
            Icon::Download => "📥",
            Icon::File => "📄",
        };
        write!(f, "{}", icon)
    }
}
