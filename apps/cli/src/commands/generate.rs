use anyhow::{Context, Result};
use clap::Args;
use cliclack::{intro, log, outro};
use std::path::{Path, PathBuf};
use workflow_architect::application::generators::write_artifacts;
use workflow_architect::domain::analyze_file;
use workflow_manifest::{Registry, Settings, WorkflowDependencySet};

use crate::core::context::AppContext;
use crate::ui::{self, Icon, Theme};
use crate::utils::loader::load_registry;

pub const DEFAULT_OUTPUT_DIR: &str = "deploy";

#[derive(Args, Debug)]
pub struct GenerateCommand {
    /// Only install what this workflow needs (default: the whole registry)
    #[arg(long)]
    pub workflow: Option<PathBuf>,

    /// Where install.sh, Dockerfile and modal_app.py are written
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

impl GenerateCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        intro(ui::banner("generate"))?;

        let registry = load_registry(ctx.registry_path.as_deref())?;
        let context = match &self.workflow {
            Some(path) => Some(
                analyze_file(path).with_context(|| format!("Failed to analyze {:?}", path))?,
            ),
            None => None,
        };

        match &context {
            Some(set) => log::step(format!("Scoped to workflow {}", Theme::primary(&set.id)))?,
            None => log::step("Covering every registry entry")?,
        }

        emit(&self.output_dir, &registry, context.as_ref(), &ctx.settings)?;
        outro("Artifacts ready.")?;
        Ok(())
    }
}

/// Writes the artifact set and lists what was written.
pub fn emit(
    dir: &Path,
    registry: &Registry,
    context: Option<&WorkflowDependencySet>,
    settings: &Settings,
) -> Result<Vec<PathBuf>> {
    let written = write_artifacts(dir, registry, context, settings)?;
    let listing: Vec<String> = written
        .iter()
        .map(|p| format!("  {} {}", Icon::File, p.display()))
        .collect();
    log::success(format!("Wrote {} file(s):\n{}", written.len(), listing.join("\n")))?;
    Ok(written)
}
