//! Logs commands - List audit log entries and show one in full

use anyhow::Result;
use clap::Args;
use vestry_core::domain::{DomainError, EventId};
use vestry_core::ports::Order;

use crate::commands::{
    event_row, event_table_header, open_stores, print_event_details, FilterArgs, PageArgs,
};
use crate::CliContext;

/// List audit log entries with filters
#[derive(Debug, Args)]
pub struct LogsCommand {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[command(flatten)]
    pub page: PageArgs,

    /// Sort oldest first instead of newest first
    #[arg(long)]
    pub oldest_first: bool,
}

impl LogsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;

        let filter = self.filter.to_filter()?;
        let order = if self.oldest_first {
            Order::Asc
        } else {
            Order::Desc
        };

        let events = stores
            .store
            .list(&filter, self.page.to_page(), order)
            .await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "pagination": events.pagination,
                "logs": events.events,
            }));
            return Ok(());
        }

        if events.events.is_empty() {
            formatter.info("No audit log entries match.");
            return Ok(());
        }

        formatter.success(&format!(
            "Audit log ({} of {} entries)",
            events.events.len(),
            events.pagination.total
        ));
        event_table_header(formatter.as_ref());
        for event in &events.events {
            event_row(formatter.as_ref(), event);
        }

        if events.pagination.total_pages > 1 {
            formatter.info("");
            formatter.info(&format!(
                "Page {} of {}. Use --page to see more.",
                events.pagination.page, events.pagination.total_pages
            ));
        }

        Ok(())
    }
}

/// Show one audit log entry in full
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Entry id
    pub id: i64,
}

impl ShowCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;

        let id = EventId::new(self.id);
        let event = stores
            .store
            .get(id)
            .await?
            .ok_or(DomainError::EventNotFound(id))?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&event)?);
            return Ok(());
        }

        formatter.success(&format!("Audit log entry {}", self.id));
        print_event_details(formatter.as_ref(), &event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testutil::{ctx, default_page, no_filters, setup, setup_without_db};

    use super::*;

    #[tokio::test]
    async fn test_logs_lists_seeded_entries() {
        let (_dir, config_path) = setup().await;
        let cmd = LogsCommand {
            filter: no_filters(),
            page: default_page(),
            oldest_first: false,
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_logs_oldest_first() {
        let (_dir, config_path) = setup().await;
        let cmd = LogsCommand {
            filter: no_filters(),
            page: default_page(),
            oldest_first: true,
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_logs_rejects_unknown_category() {
        let (_dir, config_path) = setup().await;
        let mut filter = no_filters();
        filter.category = Some("gardening".to_string());
        let cmd = LogsCommand {
            filter,
            page: default_page(),
            oldest_first: false,
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_err());
    }

    #[tokio::test]
    async fn test_logs_fails_without_database() {
        let (_dir, config_path) = setup_without_db();
        let cmd = LogsCommand {
            filter: no_filters(),
            page: default_page(),
            oldest_first: false,
        };
        let err = cmd.execute(&ctx(&config_path)).await.unwrap_err();
        assert!(err.to_string().contains("No audit database found"));
    }

    #[tokio::test]
    async fn test_show_displays_seeded_entry() {
        let (_dir, config_path) = setup().await;
        let cmd = ShowCommand { id: 1 };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_show_unknown_id_fails() {
        let (_dir, config_path) = setup().await;
        let cmd = ShowCommand { id: 9999 };
        let err = cmd.execute(&ctx(&config_path)).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
