//! History commands - Per-actor and per-target audit trails

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use vestry_core::domain::TargetKind;
use vestry_report::HistoryService;

use crate::commands::{event_row, event_table_header, open_stores, FilterArgs, PageArgs};
use crate::CliContext;

/// Show one actor's audit history
#[derive(Debug, Args)]
pub struct ActorCommand {
    /// Actor id (admin or member directory id)
    pub actor_id: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub page: PageArgs,
}

impl ActorCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let history = HistoryService::new(Arc::clone(&stores.store), Arc::clone(&stores.directory));

        let result = history
            .actor_history(&self.actor_id, self.filter.to_filter()?, self.page.to_page())
            .await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&result)?);
            return Ok(());
        }

        match &result.identity {
            Some(identity) => formatter.success(&format!(
                "History for {} ({})",
                identity.name.as_deref().unwrap_or(&identity.id),
                result.actor_id
            )),
            None => formatter.success(&format!(
                "History for {} (not in the directory)",
                result.actor_id
            )),
        }

        if result.events.is_empty() {
            formatter.info("No entries recorded.");
            return Ok(());
        }

        event_table_header(formatter.as_ref());
        for event in &result.events {
            event_row(formatter.as_ref(), event);
        }
        formatter.info("");
        formatter.info(&format!("{} entries total.", result.pagination.total));
        Ok(())
    }
}

/// Show the audit history of one target
#[derive(Debug, Args)]
pub struct TargetCommand {
    /// Target kind: user, admin, settings, system, data, session
    pub kind: String,

    /// Target id
    pub target_id: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub page: PageArgs,
}

impl TargetCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let kind: TargetKind = self.kind.parse()?;
        let history = HistoryService::new(Arc::clone(&stores.store), Arc::clone(&stores.directory));

        let result = history
            .target_history(
                kind,
                &self.target_id,
                self.filter.to_filter()?,
                self.page.to_page(),
            )
            .await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&result)?);
            return Ok(());
        }

        formatter.success(&format!(
            "History for {} {} ({} entries)",
            result.target_kind, result.target_id, result.pagination.total
        ));

        if result.events.is_empty() {
            formatter.info("No entries recorded.");
            return Ok(());
        }

        event_table_header(formatter.as_ref());
        for event in &result.events {
            event_row(formatter.as_ref(), event);
        }
        Ok(())
    }
}
