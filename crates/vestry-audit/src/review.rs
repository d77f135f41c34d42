//! ReviewService - flag and review workflow over stored events
//!
//! Unlike the write path, review mutations surface their errors: the caller
//! asked for a specific change to a specific event and must learn when it
//! did not happen. Both operations are load-modify-store; concurrent
//! touches resolve last-write-wins.

use std::sync::Arc;

use anyhow::Context;
use vestry_core::domain::{AuditEvent, DomainError, EventId};
use vestry_core::ports::{IEventStore, ReviewState};

/// Applies flag/review mutations to stored audit events.
pub struct ReviewService {
    store: Arc<dyn IEventStore>,
}

impl ReviewService {
    /// Creates a review service backed by the given store.
    pub fn new(store: Arc<dyn IEventStore>) -> Self {
        Self { store }
    }

    /// Flags an event for review, returning the updated event.
    ///
    /// Requires a non-empty reason. Re-flagging overwrites the previous
    /// reason, reviewer, and timestamp.
    pub async fn flag(
        &self,
        id: EventId,
        reason: &str,
        reviewer: &str,
    ) -> anyhow::Result<AuditEvent> {
        let mut event = self
            .store
            .get(id)
            .await
            .context("Failed to load audit event")?
            .ok_or(DomainError::EventNotFound(id))?;

        event.flag(reason, reviewer)?;

        let updated = self
            .store
            .update_review(id, &ReviewState::of(&event))
            .await
            .context("Failed to persist review state")?;
        if !updated {
            // Deleted between load and store
            return Err(DomainError::EventNotFound(id).into());
        }

        tracing::debug!(event_id = %id, reviewer = %reviewer, "Flagged audit event");
        Ok(event)
    }

    /// Records a review of an event, returning the updated event.
    ///
    /// A prior flag is not required. Repeated reviews overwrite the
    /// previous notes, reviewer, and timestamp.
    pub async fn review(
        &self,
        id: EventId,
        notes: Option<String>,
        reviewer: &str,
    ) -> anyhow::Result<AuditEvent> {
        let mut event = self
            .store
            .get(id)
            .await
            .context("Failed to load audit event")?
            .ok_or(DomainError::EventNotFound(id))?;

        event.review(notes, reviewer);

        let updated = self
            .store
            .update_review(id, &ReviewState::of(&event))
            .await
            .context("Failed to persist review state")?;
        if !updated {
            return Err(DomainError::EventNotFound(id).into());
        }

        tracing::debug!(event_id = %id, reviewer = %reviewer, "Reviewed audit event");
        Ok(event)
    }
}
