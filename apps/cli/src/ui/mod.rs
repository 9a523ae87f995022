use indicatif::MultiProgress;
use std::sync::OnceLock;

pub mod theme;

pub use theme::{Icon, Theme};

static MULTI_PROGRESS: OnceLock<MultiProgress> = OnceLock::new();

pub fn multi_progress() -> &'static MultiProgress {
    MULTI_PROGRESS.get_or_init(MultiProgress::new)
}

pub fn error(message: impl AsRef<str>) {
    let msg = format!("{} {}", Theme::error(Icon::Cross), message.as_ref());
    if multi_progress().println(&msg).is_err() {
        eprintln!("{}", msg);
    }
}

/// Title line for `cliclack::intro`.
pub fn banner(section: &str) -> String {
    format!(
        "{} {} {}",
        console::style("workflow-architect").bold(),
        console::style(concat!("v", env!("CARGO_PKG_VERSION"))).dim(),
        console::style(section).cyan()
    )
}

/// Pads `cells` to the widths in `widths`, two spaces between columns.
pub fn table_row(cells: &[&str], widths: &[usize]) -> String {
    let mut row = String::new();
    for (i, cell) in cells.iter().enumerate() {
        let width = widths.get(i).copied().unwrap_or(0);
        if i + 1 == cells.len() {
            row.push_str(cell);
        } else {
            row.push_str(&format!("{:<width$}  ", cell, width = width));
        }
    }
    row
}
