use anyhow::Result;
use clap::Args;
use cliclack::{intro, log, outro};
use std::path::PathBuf;
use workflow_architect::domain::assert_all_verified;
use workflow_manifest::VerificationReport;

use crate::core::context::AppContext;
use crate::core::error::CliError;
use crate::ui::{self, Icon, Theme};
use crate::utils::loader::{load_registry, write_json};

#[derive(Args, Debug)]
pub struct VerifyCommand {
    /// Exit with an error when any entry fails verification
    #[arg(long)]
    pub fail_fast: bool,

    /// Write the verification report as JSON
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl VerifyCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        intro(ui::banner("verify"))?;

        let registry = load_registry(ctx.registry_path.as_deref())?;
        let service = ctx.discovery_service(true)?;
        let report = service.verify_all_versions(&registry).await;
        print_verification(&report)?;

        if let Some(output) = &self.output {
            write_json(output, &report)?;
            log::success(format!("{} Report written to {}", Icon::File, output.display()))?;
        }

        if self.fail_fast {
            assert_all_verified(&report).map_err(CliError::from)?;
        }

        outro("Verification complete.")?;
        Ok(())
    }
}

pub fn print_verification(report: &VerificationReport) -> Result<()> {
    let mut failures = Vec::new();
    for name in report.failing_nodes() {
        let error = report.nodes[name].error.as_deref().unwrap_or("not verified");
        failures.push(format!("  - {} {}: {}", Theme::error(Icon::Cross), name, Theme::muted(error)));
    }
    for name in report.failing_models() {
        let error = report.models[name].error.as_deref().unwrap_or("not verified");
        failures.push(format!("  - {} {}: {}", Theme::error(Icon::Cross), name, Theme::muted(error)));
    }

    let nodes_ok = report.nodes.len() - report.failing_nodes().len();
    let models_ok = report.models.len() - report.failing_models().len();
    let counts = format!(
        "Nodes: {}/{} verified  Models: {}/{} verified",
        nodes_ok,
        report.nodes.len(),
        models_ok,
        report.models.len()
    );

    if failures.is_empty() {
        log::success(format!("{} {}", Theme::success(Icon::Check), counts))?;
    } else {
        log::warning(format!("{}\n{}", counts, failures.join("\n")))?;
    }
    Ok(())
}
