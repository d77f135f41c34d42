//! Export command - Write audit log entries to JSON or CSV
//!
//! The export itself lands on the audit trail, attributed to `--by` or
//! to the system actor when no admin id is given.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use vestry_core::domain::{Actor, ActorKind};
use vestry_report::{ExportFormat, ExportService};

use crate::commands::{open_stores, FilterArgs};
use crate::CliContext;

/// Export audit log entries
#[derive(Debug, Args)]
pub struct ExportCommand {
    /// Output format: json or csv
    #[arg(long, default_value = "json")]
    pub format: String,

    /// Include payload and change details (JSON only)
    #[arg(long)]
    pub include_details: bool,

    /// Write to this file instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Admin id to attribute the export to
    #[arg(long)]
    pub by: Option<String>,

    #[command(flatten)]
    pub filter: FilterArgs,
}

impl ExportCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let export_service = ExportService::new(Arc::clone(&stores.store));

        let format: ExportFormat = self.format.parse()?;
        let filter = self.filter.to_filter()?;

        let export = export_service
            .export(&filter, format, self.include_details)
            .await?;

        let actor = match &self.by {
            Some(by) => Actor::new(ActorKind::Admin, by.as_str()),
            None => Actor::system(),
        };
        stores
            .recorder()
            .log_export(actor, format.as_str(), export.count)
            .await;

        match &self.output {
            Some(path) => {
                std::fs::write(path, &export.body)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                formatter.success(&format!(
                    "Exported {} entries to {}",
                    export.count,
                    path.display()
                ));
            }
            None => {
                print!("{}", export.body);
                if !export.body.ends_with('\n') {
                    println!();
                }
            }
        }
        Ok(())
    }
}
