use anyhow::Result;
use clap::Args;
use cliclack::{intro, log, outro};
use std::path::{Path, PathBuf};
use workflow_architect::domain::build_report;
use workflow_manifest::{DependencyReport, Registry};

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::{self, Icon, Theme};
use crate::utils::loader::{collect_workflows, load_registry, write_json};

#[derive(Args, Debug)]
pub struct AnalyzeCommand {
    /// Workflow files (API-format graph JSON)
    pub workflows: Vec<PathBuf>,

    /// Analyze every .json workflow under this directory
    #[arg(long)]
    pub workflows_dir: Option<PathBuf>,

    /// Write the dependency report as JSON
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl AnalyzeCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        intro(ui::banner("analyze"))?;

        let registry = load_registry(ctx.registry_path.as_deref())?;
        let report = run_analysis(&self.workflows, self.workflows_dir.as_deref(), &registry)?;
        print_report(&report)?;

        if let Some(output) = &self.output {
            write_json(output, &report)?;
            log::success(format!("{} Report written to {}", Icon::File, output.display()))?;
        }

        outro(format!("{} workflow(s) analyzed.", report.workflows.len()))?;
        Ok(())
    }
}

pub fn run_analysis(
    files: &[PathBuf],
    dir: Option<&Path>,
    registry: &Registry,
) -> Result<DependencyReport> {
    if files.is_empty() && dir.is_none() {
        return Err(CliError::Config(
            "nothing to analyze: pass workflow files or --workflows-dir".to_string(),
        )
        .into());
    }

    let workflows = collect_workflows(files, dir)?;
    if workflows.is_empty() {
        log::warning("No workflow files found.")?;
    }
    Ok(build_report(workflows, registry))
}

pub fn print_report(report: &DependencyReport) -> Result<()> {
    let summary = report.summary();

    if !report.workflows.is_empty() {
        let headers = ["ID", "TYPE", "NODES", "MODELS"];
        let rows: Vec<[String; 4]> = report
            .workflows
            .iter()
            .map(|w| {
                [
                    w.id.clone(),
                    w.workflow_type.to_string(),
                    w.node_types.len().to_string(),
                    w.models.len().to_string(),
                ]
            })
            .collect();

        let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut table = Theme::bold(ui::table_row(&headers, &widths));
        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            table.push('\n');
            table.push_str(&ui::table_row(&cells, &widths));
        }
        log::info(table)?;
    }

    log::info(format!(
        "{} {} custom node type(s), {} model(s) across {} workflow(s)",
        Icon::Package,
        summary.node_types,
        summary.models,
        summary.workflows
    ))?;

    let missing = &report.missing_from_registry;
    if missing.is_empty() {
        log::success(format!("{} Every dependency has a registry entry", Icon::Check))?;
        return Ok(());
    }
    if !missing.nodes.is_empty() {
        log::warning(format!(
            "{} node type(s) missing from the registry:\n{}",
            summary.missing_nodes,
            bullet_list(&missing.nodes)
        ))?;
    }
    if !missing.models.is_empty() {
        log::warning(format!(
            "{} model(s) missing from the registry:\n{}",
            summary.missing_models,
            bullet_list(&missing.models)
        ))?;
    }
    Ok(())
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("  - {}", Theme::muted(item)))
        .collect::<Vec<_>>()
        .join("\n")
}
