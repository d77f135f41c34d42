//! Statistics aggregations over the audit log
//!
//! Thin coordinator over the store's GROUP BY queries: one time series at
//! the requested granularity plus category, risk, and actor breakdowns.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use vestry_core::domain::ActionCategory;
use vestry_core::ports::{
    ActorStat, BucketStat, Granularity, IEventStore, RiskStat, TimeRange,
};

/// How many actors the top-actors breakdown reports.
pub const TOP_ACTORS_LIMIT: u32 = 10;

/// Per-category counts with the derived success rate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: ActionCategory,
    pub total: u64,
    pub successful: u64,
    /// Successful share in percent (0 when the category has no events)
    pub success_rate: f64,
}

/// Full statistics response for one window and granularity
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsReport {
    pub granularity: Granularity,
    pub series: Vec<BucketStat>,
    pub categories: Vec<CategoryBreakdown>,
    pub risk_levels: Vec<RiskStat>,
    pub top_actors: Vec<ActorStat>,
}

/// Serves the statistics surface.
pub struct StatisticsService {
    store: Arc<dyn IEventStore>,
}

impl StatisticsService {
    /// Creates a statistics service backed by the given store.
    pub fn new(store: Arc<dyn IEventStore>) -> Self {
        Self { store }
    }

    /// Builds the complete statistics report for a window.
    pub async fn statistics(
        &self,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<StatisticsReport> {
        let series = self
            .store
            .bucket_series(&range, granularity)
            .await
            .context("Failed to build statistics time series")?;

        let categories = self
            .store
            .category_breakdown(&range)
            .await
            .context("Failed to build category breakdown")?
            .into_iter()
            .map(|stat| {
                let success_rate = if stat.total == 0 {
                    0.0
                } else {
                    stat.successful as f64 * 100.0 / stat.total as f64
                };
                CategoryBreakdown {
                    category: stat.category,
                    total: stat.total,
                    successful: stat.successful,
                    success_rate,
                }
            })
            .collect();

        let risk_levels = self
            .store
            .risk_breakdown(&range)
            .await
            .context("Failed to build risk breakdown")?;

        let top_actors = self
            .store
            .top_actors(&range, TOP_ACTORS_LIMIT)
            .await
            .context("Failed to build top actors breakdown")?;

        Ok(StatisticsReport {
            granularity,
            series,
            categories,
            risk_levels,
            top_actors,
        })
    }
}
