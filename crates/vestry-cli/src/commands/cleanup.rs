//! Cleanup command - Retention archive/delete runs

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use vestry_audit::RetentionService;
use vestry_core::domain::{Actor, ActorKind};
use vestry_core::ports::CleanupMode;

use crate::commands::open_stores;
use crate::CliContext;

/// Archive or delete old audit log entries
#[derive(Debug, Args)]
pub struct CleanupCommand {
    /// Age threshold in days (defaults to the configured retention)
    #[arg(long)]
    pub older_than_days: Option<u32>,

    /// What to do with matching entries: archive or delete
    #[arg(long, default_value = "archive")]
    pub mode: String,

    /// Keep critical-risk entries regardless of age (true/false)
    #[arg(long)]
    pub preserve_critical: Option<bool>,

    /// Admin id to attribute the run to
    #[arg(long)]
    pub by: Option<String>,
}

impl CleanupCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let retention = RetentionService::new(Arc::clone(&stores.store));

        let mode: CleanupMode = self.mode.parse()?;
        let days = self
            .older_than_days
            .unwrap_or(stores.config.retention.cleanup_days);
        let preserve_critical = self
            .preserve_critical
            .unwrap_or(stores.config.retention.preserve_critical);

        let report = retention.cleanup(days, mode, preserve_critical).await?;

        let actor = match &self.by {
            Some(by) => Actor::new(ActorKind::Admin, by.as_str()),
            None => Actor::system(),
        };
        stores
            .recorder()
            .log_cleanup_run(actor, mode, days, report.affected)
            .await;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        let verb = match mode {
            CleanupMode::Archive => "Archived",
            CleanupMode::Delete => "Deleted",
        };
        formatter.success(&format!(
            "{} {} entries older than {} days",
            verb, report.affected, days
        ));
        if preserve_critical {
            formatter.info("Critical-risk entries were preserved.");
        }
        Ok(())
    }
}
