use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult};
use crate::models::_entities::{events, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub event_type: String,
    pub data: serde_json::Value,
    pub processed: bool,
    pub error: Option<String>,
    pub retry_count: i32,
    pub next_retry_at: Option<chrono::NaiveDateTime>,
    pub timestamp: chrono::NaiveDateTime,
}

impl From<events::Model> for Event {
    fn from(model: events::Model) -> Self {
        Self {
            id: model.id,
            event_type: model.event_type,
            data: model.data,
            processed: model.processed,
            error: model.error,
            retry_count: model.retry_count,
            next_retry_at: model.next_retry_at,
            timestamp: model.timestamp,
        }
    }
}

impl Event {
    /// Durably records an event. Called from inside the same transaction that
    /// mutates transaction state, so the event and the state change commit
    /// atomically (the outbox pattern).
    pub async fn append<C: ConnectionTrait>(db: &C, event_type: &str, data: serde_json::Value) -> EngineResult<Event> {
        let now = chrono::Utc::now().naive_utc();
        let active = events::ActiveModel {
            id: Set(Uuid::new_v4()),
            event_type: Set(event_type.to_string()),
            data: Set(data),
            processed: Set(false),
            error: Set(None),
            retry_count: Set(0),
            next_retry_at: Set(None),
            timestamp: Set(now),
        };
        let model = active.insert(db).await?;
        Ok(model.into())
    }

    /// Due events ready for dispatch: unprocessed, and either never attempted
    /// or past their backoff window.
    pub async fn find_due(db: &DatabaseConnection, now: chrono::NaiveDateTime, limit: u64) -> EngineResult<Vec<Event>> {
        let models = Events::find()
            .filter(events::Column::Processed.eq(false))
            .filter(
                Condition::any()
                    .add(events::Column::NextRetryAt.is_null())
                    .add(events::Column::NextRetryAt.lte(now)),
            )
            .order_by_asc(events::Column::Timestamp)
            .limit(limit)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Event::from).collect())
    }

    pub async fn mark_processed(db: &DatabaseConnection, id: Uuid) -> EngineResult<()> {
        let model = Events::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::not_found("event not found"))?;
        let mut active: events::ActiveModel = model.into();
        active.processed = Set(true);
        active.error = Set(None);
        active.update(db).await?;
        Ok(())
    }

    /// Schedules another dispatch attempt; `processed` stays false.
    pub async fn mark_for_retry(
        db: &DatabaseConnection,
        id: Uuid,
        error: &str,
        retry_count: i32,
        next_retry_at: chrono::NaiveDateTime,
    ) -> EngineResult<()> {
        let model = Events::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::not_found("event not found"))?;
        let mut active: events::ActiveModel = model.into();
        active.error = Set(Some(error.to_string()));
        active.retry_count = Set(retry_count);
        active.next_retry_at = Set(Some(next_retry_at));
        active.update(db).await?;
        Ok(())
    }

    /// Terminal failure: `processed=true ∧ error≠null`. No further dispatch
    /// attempts will be made.
    pub async fn mark_permanently_failed(db: &DatabaseConnection, id: Uuid, error: &str) -> EngineResult<()> {
        let model = Events::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::not_found("event not found"))?;
        let mut active: events::ActiveModel = model.into();
        active.processed = Set(true);
        active.error = Set(Some(error.to_string()));
        active.update(db).await?;
        Ok(())
    }

    /// Deletes successfully delivered events older than `older_than`.
    /// Permanently failed events (`processed=true ∧ error≠null`) are kept —
    /// the outbox is a delivery queue for the delivered ones, but the audit
    /// trail for failed deliveries must survive pruning.
    pub async fn prune_processed(db: &DatabaseConnection, older_than: chrono::NaiveDateTime) -> EngineResult<u64> {
        let result = Events::delete_many()
            .filter(events::Column::Processed.eq(true))
            .filter(events::Column::Error.is_null())
            .filter(events::Column::Timestamp.lt(older_than))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
