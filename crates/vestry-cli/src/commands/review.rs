//! Review commands - Flag entries and mark them reviewed
//!
//! Both commands write a self-audit entry attributed to the `--by` admin,
//! so the review trail itself stays on the record.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use vestry_audit::ReviewService;
use vestry_core::domain::{Actor, ActorKind, EventId};

use crate::commands::open_stores;
use crate::CliContext;

/// Flag an audit log entry for review
#[derive(Debug, Args)]
pub struct FlagCommand {
    /// Entry id
    pub id: i64,

    /// Why the entry needs review
    #[arg(long)]
    pub reason: String,

    /// Admin id performing the flag
    #[arg(long)]
    pub by: String,
}

impl FlagCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let review = ReviewService::new(Arc::clone(&stores.store));

        let id = EventId::new(self.id);
        let event = review.flag(id, &self.reason, &self.by).await?;

        let actor = Actor::new(ActorKind::Admin, self.by.as_str());
        stores
            .recorder()
            .log_flag_event(actor, id, &self.reason)
            .await;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&event)?);
            return Ok(());
        }

        formatter.success(&format!("Flagged audit log entry {}", self.id));
        formatter.info(&format!("Reason: {}", self.reason));
        Ok(())
    }
}

/// Mark an audit log entry as reviewed
#[derive(Debug, Args)]
pub struct ReviewCommand {
    /// Entry id
    pub id: i64,

    /// Review notes
    #[arg(long)]
    pub notes: Option<String>,

    /// Admin id performing the review
    #[arg(long)]
    pub by: String,
}

impl ReviewCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let review = ReviewService::new(Arc::clone(&stores.store));

        let id = EventId::new(self.id);
        let event = review.review(id, self.notes.clone(), &self.by).await?;

        let actor = Actor::new(ActorKind::Admin, self.by.as_str());
        stores.recorder().log_review_event(actor, id).await;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&event)?);
            return Ok(());
        }

        formatter.success(&format!(
            "Marked audit log entry {} as reviewed",
            self.id
        ));
        Ok(())
    }
}
