use anyhow::Result;
use clap::Args;
use cliclack::{intro, log, outro};
use std::path::PathBuf;
use workflow_architect::application::DiscoverySummary;
use workflow_manifest::Registry;

use crate::core::context::AppContext;
use crate::ui::{self, Icon, Theme};
use crate::utils::loader::{load_registry, save_registry};

#[derive(Args, Debug)]
pub struct DiscoverCommand {
    /// Persist the refreshed registry back to --registry
    #[arg(long)]
    pub write_registry: bool,

    /// Also write the refreshed registry to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl DiscoverCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        intro(ui::banner("discover"))?;

        let target = if self.write_registry {
            Some(ctx.writable_registry_path()?.to_path_buf())
        } else {
            None
        };

        let mut registry = load_registry(ctx.registry_path.as_deref())?;
        let service = ctx.discovery_service(true)?;

        log::step(format!(
            "{} Refreshing {} node(s) and {} model(s)",
            Icon::Download,
            registry.nodes.len(),
            registry.models.len()
        ))?;
        let summary = service.discover_all(&mut registry).await;
        print_discovery(&registry, &summary)?;

        for path in target.iter().chain(self.output.iter()) {
            save_registry(path, &registry)?;
            log::success(format!("{} Registry written to {}", Icon::File, path.display()))?;
        }
        if target.is_none() && self.output.is_none() {
            log::info(Theme::muted("Registry not saved (pass --write-registry to persist)"))?;
        }

        outro("Discovery complete.")?;
        Ok(())
    }
}

pub fn print_discovery(registry: &Registry, summary: &DiscoverySummary) -> Result<()> {
    let failures: Vec<String> = registry
        .nodes
        .iter()
        .filter_map(|(name, entry)| entry.last_error.as_ref().map(|e| (name, e)))
        .chain(
            registry
                .models
                .iter()
                .filter_map(|(name, entry)| entry.last_error.as_ref().map(|e| (name, e))),
        )
        .map(|(name, error)| format!("  - {}: {}", Theme::bold(name), Theme::muted(error)))
        .collect();

    if !failures.is_empty() {
        log::warning(format!(
            "{} entr{} could not be verified:\n{}",
            failures.len(),
            if failures.len() == 1 { "y" } else { "ies" },
            failures.join("\n")
        ))?;
    }

    log::info(format!(
        "Nodes verified: {}/{}  Models verified: {}/{}",
        summary.nodes_verified, summary.nodes, summary.models_verified, summary.models
    ))?;
    Ok(())
}
