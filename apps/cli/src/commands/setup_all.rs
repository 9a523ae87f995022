use anyhow::Result;
use clap::Args;
use cliclack::{intro, log, outro};
use std::path::PathBuf;
use workflow_architect::domain::assert_all_verified;
use workflow_manifest::{DependencyReport, WorkflowDependencySet};

use crate::commands::analyze::{print_report, run_analysis};
use crate::commands::discover::print_discovery;
use crate::commands::generate::{emit, DEFAULT_OUTPUT_DIR};
use crate::commands::verify::print_verification;
use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::{self, Icon};
use crate::utils::loader::{load_registry, save_registry, write_json};

pub const DEPENDENCY_REPORT_FILE: &str = "dependency-report.json";
pub const VERIFICATION_REPORT_FILE: &str = "verification-report.json";

#[derive(Args, Debug)]
pub struct SetupAllCommand {
    /// Directory of workflow JSON files
    #[arg(long)]
    pub workflows_dir: PathBuf,

    /// Where artifacts and reports are written
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Persist the refreshed registry back to --registry
    #[arg(long)]
    pub write_registry: bool,

    /// Stop before generating when any entry fails verification
    #[arg(long)]
    pub fail_fast: bool,
}

impl SetupAllCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        intro(ui::banner("setup-all"))?;

        let target = if self.write_registry {
            Some(ctx.writable_registry_path()?.to_path_buf())
        } else {
            None
        };
        let mut registry = load_registry(ctx.registry_path.as_deref())?;

        log::step("1/4 Analyzing workflows")?;
        let report = run_analysis(&[], Some(&self.workflows_dir), &registry)?;
        print_report(&report)?;
        write_json(&self.output_dir.join(DEPENDENCY_REPORT_FILE), &report)?;

        log::step(format!("{} 2/4 Discovering upstream versions", Icon::Download))?;
        let service = ctx.discovery_service(true)?;
        let summary = service.discover_all(&mut registry).await;
        print_discovery(&registry, &summary)?;
        if let Some(path) = &target {
            save_registry(path, &registry)?;
            log::success(format!("{} Registry written to {}", Icon::File, path.display()))?;
        }

        log::step("3/4 Verifying pins")?;
        let verification = service.verify_all_versions(&registry).await;
        print_verification(&verification)?;
        write_json(&self.output_dir.join(VERIFICATION_REPORT_FILE), &verification)?;
        if self.fail_fast {
            assert_all_verified(&verification).map_err(CliError::from)?;
        }

        log::step("4/4 Generating artifacts")?;
        let scope = artifact_scope(&report);
        emit(&self.output_dir, &registry, scope.as_ref(), &ctx.settings)?;

        outro(format!(
            "Setup complete. Reports and artifacts are in {}",
            self.output_dir.display()
        ))?;
        Ok(())
    }
}

/// What the artifacts should install: the single workflow when there is one,
/// otherwise the union of every analyzed workflow's dependencies.
fn artifact_scope(report: &DependencyReport) -> Option<WorkflowDependencySet> {
    match report.workflows.as_slice() {
        [] => None,
        [single] => Some(single.clone()),
        many => Some(WorkflowDependencySet {
            id: "all-workflows".to_string(),
            display_name: format!("{} workflows", many.len()),
            node_types: report.all_node_types.clone(),
            models: report.all_models.clone(),
            ..Default::default()
        }),
    }
}
