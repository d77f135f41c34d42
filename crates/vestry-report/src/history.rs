//! Actor and target history with identity resolution
//!
//! History responses decorate the paginated event list with a resolved
//! identity from the congregation directory. The events carry denormalized
//! name/email snapshots from write time; the resolved identity shows the
//! directory's current view, and is `None` when the id no longer exists.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use vestry_core::domain::{AuditEvent, TargetKind};
use vestry_core::ports::{
    EventFilter, IDirectory, IEventStore, IdentitySummary, Order, Page, Pagination,
};

/// Paginated history of one actor's events plus their resolved identity
#[derive(Debug, Clone, Serialize)]
pub struct ActorHistory {
    pub actor_id: String,
    /// Current directory record, `None` when the id is unknown
    pub identity: Option<IdentitySummary>,
    pub events: Vec<AuditEvent>,
    pub pagination: Pagination,
}

/// Paginated history of events against one target plus its identity
#[derive(Debug, Clone, Serialize)]
pub struct TargetHistory {
    pub target_id: String,
    pub target_kind: TargetKind,
    pub identity: Option<IdentitySummary>,
    pub events: Vec<AuditEvent>,
    pub pagination: Pagination,
}

/// Serves actor/target history queries.
pub struct HistoryService {
    store: Arc<dyn IEventStore>,
    directory: Arc<dyn IDirectory>,
}

impl HistoryService {
    /// Creates a history service over the given store and directory.
    pub fn new(store: Arc<dyn IEventStore>, directory: Arc<dyn IDirectory>) -> Self {
        Self { store, directory }
    }

    /// Lists one actor's events, newest first, with their identity.
    ///
    /// `filter` may carry additional bounds (time range, category, risk);
    /// its `actor_id` is overwritten with the requested actor.
    pub async fn actor_history(
        &self,
        actor_id: &str,
        filter: EventFilter,
        page: Page,
    ) -> Result<ActorHistory> {
        let filter = filter.with_actor_id(actor_id);
        let events = self
            .store
            .list(&filter, page, Order::Desc)
            .await
            .context("Failed to list actor history")?;
        let identity = self.resolve(actor_id).await?;

        Ok(ActorHistory {
            actor_id: actor_id.to_string(),
            identity,
            events: events.events,
            pagination: events.pagination,
        })
    }

    /// Lists the events against one target, newest first, with its identity.
    pub async fn target_history(
        &self,
        kind: TargetKind,
        target_id: &str,
        filter: EventFilter,
        page: Page,
    ) -> Result<TargetHistory> {
        let filter = filter.with_target(kind, target_id);
        let events = self
            .store
            .list(&filter, page, Order::Desc)
            .await
            .context("Failed to list target history")?;
        let identity = self.resolve(target_id).await?;

        Ok(TargetHistory {
            target_id: target_id.to_string(),
            target_kind: kind,
            identity,
            events: events.events,
            pagination: events.pagination,
        })
    }

    /// Resolves an id against the admin directory first, then members.
    async fn resolve(&self, id: &str) -> Result<Option<IdentitySummary>> {
        if let Some(admin) = self
            .directory
            .find_admin(id)
            .await
            .context("Failed to query admin directory")?
        {
            return Ok(Some(admin));
        }
        self.directory
            .find_member(id)
            .await
            .context("Failed to query member directory")
    }
}
