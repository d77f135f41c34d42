//! Security commands - Elevated-risk event feed and recent alerts

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use vestry_core::domain::RiskLevel;
use vestry_core::ports::{SecurityAlert, TimeRange};
use vestry_report::SecurityService;

use crate::commands::{event_row, event_table_header, open_stores, parse_since, PageArgs};
use crate::CliContext;

/// List elevated-risk security events
#[derive(Debug, Args)]
pub struct SecurityCommand {
    /// Filter by risk level (repeatable; defaults to high and critical)
    #[arg(long)]
    pub risk: Vec<String>,

    /// Only flagged entries
    #[arg(long)]
    pub flagged_only: bool,

    /// Show entries since this time
    #[arg(long)]
    pub since: Option<String>,

    /// Show entries until this time
    #[arg(long)]
    pub until: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

impl SecurityCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let security = SecurityService::new(Arc::clone(&stores.store));

        let levels = self
            .risk
            .iter()
            .map(|value| value.parse::<RiskLevel>())
            .collect::<Result<Vec<_>, _>>()?;
        let range = TimeRange::new(
            self.since.as_deref().map(parse_since).transpose()?,
            self.until.as_deref().map(parse_since).transpose()?,
        );

        let feed = security
            .security_events(levels, self.flagged_only, range, self.page.to_page())
            .await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&feed)?);
            return Ok(());
        }

        formatter.success(&format!(
            "Security events: {} critical, {} high, {} flagged, {} elevated awaiting review",
            feed.summary.critical,
            feed.summary.high,
            feed.summary.flagged,
            feed.summary.unreviewed_elevated
        ));

        if feed.events.is_empty() {
            formatter.info("Nothing in this window.");
            return Ok(());
        }

        event_table_header(formatter.as_ref());
        for event in &feed.events {
            event_row(formatter.as_ref(), event);
        }
        Ok(())
    }
}

/// List recent security alerts
#[derive(Debug, Args)]
pub struct AlertsCommand {
    /// Look-back window in hours
    #[arg(long, default_value = "24")]
    pub hours: u32,

    /// Maximum number of alerts to show
    #[arg(long, default_value = "50")]
    pub limit: u32,
}

impl AlertsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let security = SecurityService::new(Arc::clone(&stores.store));

        let alerts = security.recent_alerts(self.hours, self.limit).await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::json!({
                "hours": self.hours,
                "count": alerts.len(),
                "alerts": alerts,
            }));
            return Ok(());
        }

        if alerts.is_empty() {
            formatter.success(&format!("No alerts in the last {} hours", self.hours));
            return Ok(());
        }

        formatter.success(&format!(
            "{} alerts in the last {} hours",
            alerts.len(),
            self.hours
        ));
        formatter.info("");
        for event in &alerts {
            let alert = SecurityAlert::for_event(event);
            formatter.info(&format!(
                "{}  {}",
                alert.timestamp.format("%Y-%m-%d %H:%M:%S"),
                alert.headline()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testutil::{ctx, default_page, setup};

    use super::*;

    #[tokio::test]
    async fn test_security_defaults_run() {
        let (_dir, config_path) = setup().await;
        let cmd = SecurityCommand {
            risk: Vec::new(),
            flagged_only: false,
            since: None,
            until: None,
            page: default_page(),
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_security_rejects_unknown_risk() {
        let (_dir, config_path) = setup().await;
        let cmd = SecurityCommand {
            risk: vec!["extreme".to_string()],
            flagged_only: false,
            since: None,
            until: None,
            page: default_page(),
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_err());
    }

    #[tokio::test]
    async fn test_alerts_default_window() {
        let (_dir, config_path) = setup().await;
        let cmd = AlertsCommand {
            hours: 24,
            limit: 50,
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_alerts_zero_hours_fails() {
        let (_dir, config_path) = setup().await;
        let cmd = AlertsCommand { hours: 0, limit: 50 };
        assert!(cmd.execute(&ctx(&config_path)).await.is_err());
    }
}
