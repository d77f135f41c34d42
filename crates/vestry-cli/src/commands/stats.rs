//! Statistics and compliance report commands

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use vestry_core::ports::{Granularity, TimeRange};
use vestry_report::{ComplianceService, StatisticsService};

use crate::commands::{open_stores, parse_since};
use crate::CliContext;

/// Show audit activity statistics
#[derive(Debug, Args)]
pub struct StatsCommand {
    /// Show entries since this time
    #[arg(long)]
    pub since: Option<String>,

    /// Show entries until this time
    #[arg(long)]
    pub until: Option<String>,

    /// Bucket size: hour, day, or month
    #[arg(long, default_value = "day")]
    pub granularity: String,
}

impl StatsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let statistics = StatisticsService::new(Arc::clone(&stores.store));

        let range = TimeRange::new(
            self.since.as_deref().map(parse_since).transpose()?,
            self.until.as_deref().map(parse_since).transpose()?,
        );
        let granularity: Granularity = self.granularity.parse()?;

        let report = statistics.statistics(range, granularity).await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        formatter.success(&format!("Audit activity by {}", report.granularity));

        if report.series.is_empty() {
            formatter.info("No activity in this window.");
        } else {
            formatter.info("");
            formatter.info("Bucket            Total   OK      Failed  Sensitive");
            formatter.info("----------------- ------- ------- ------- ---------");
            for bucket in &report.series {
                formatter.info(&format!(
                    "{:<17} {:<7} {:<7} {:<7} {}",
                    bucket.bucket,
                    bucket.total,
                    bucket.successful,
                    bucket.failed,
                    bucket.sensitive
                ));
            }
        }

        if !report.categories.is_empty() {
            formatter.info("");
            formatter.info("By category:");
            for cat in &report.categories {
                formatter.info(&format!(
                    "{:<18} {:>6} total, {:>5.1}% ok",
                    cat.category.as_str(),
                    cat.total,
                    cat.success_rate
                ));
            }
        }

        if !report.top_actors.is_empty() {
            formatter.info("");
            formatter.info("Most active:");
            for actor in &report.top_actors {
                formatter.info(&format!(
                    "{:<16} {:>6} actions ({} elevated)",
                    actor.actor_id, actor.total, actor.elevated
                ));
            }
        }

        Ok(())
    }
}

/// Generate a compliance report
#[derive(Debug, Args)]
pub struct ReportCommand {
    /// Report period start
    #[arg(long)]
    pub since: Option<String>,

    /// Report period end
    #[arg(long)]
    pub until: Option<String>,
}

impl ReportCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let stores = open_stores(ctx.config.as_deref()).await?;
        let compliance = ComplianceService::new(Arc::clone(&stores.store));

        let range = TimeRange::new(
            self.since.as_deref().map(parse_since).transpose()?,
            self.until.as_deref().map(parse_since).transpose()?,
        );

        let report = compliance.report(range).await?;

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&report)?);
            return Ok(());
        }

        formatter.success(&format!(
            "Compliance score: {}/100",
            report.compliance_score
        ));
        formatter.info("");
        formatter.info(&format!("Total entries:     {}", report.total_logs));
        formatter.info(&format!("Critical events:   {}", report.critical_events));
        formatter.info(&format!("Sensitive actions: {}", report.sensitive_actions));
        formatter.info(&format!("Failed actions:    {}", report.failed_actions));
        formatter.info(&format!("Flagged entries:   {}", report.flagged_events));
        formatter.info("");
        formatter.info("Recommendations:");
        for rec in &report.recommendations {
            formatter.info(&format!("- {}", rec));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testutil::{ctx, setup};

    use super::*;

    #[tokio::test]
    async fn test_stats_daily_runs() {
        let (_dir, config_path) = setup().await;
        let cmd = StatsCommand {
            since: None,
            until: None,
            granularity: "day".to_string(),
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }

    #[tokio::test]
    async fn test_stats_rejects_unknown_granularity() {
        let (_dir, config_path) = setup().await;
        let cmd = StatsCommand {
            since: None,
            until: None,
            granularity: "week".to_string(),
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_err());
    }

    #[tokio::test]
    async fn test_stats_rejects_bad_since() {
        let (_dir, config_path) = setup().await;
        let cmd = StatsCommand {
            since: Some("yesterday-ish".to_string()),
            until: None,
            granularity: "day".to_string(),
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_err());
    }

    #[tokio::test]
    async fn test_report_runs() {
        let (_dir, config_path) = setup().await;
        let cmd = ReportCommand {
            since: Some("7d".to_string()),
            until: None,
        };
        assert!(cmd.execute(&ctx(&config_path)).await.is_ok());
    }
}
