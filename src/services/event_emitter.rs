//! In-process fan-out plus durable outbox append (§4.4). Append always
//! precedes dispatch so a crash between the two is recoverable by
//! `EventProcessor` rescanning the outbox.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::errors::EngineResult;
use crate::models::Event;

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, data: &serde_json::Value) -> EngineResult<()>;
}

pub type EventFilter = Arc<dyn Fn(&str, &serde_json::Value) -> bool + Send + Sync>;

#[derive(Default)]
pub struct EventEmitter {
    handlers: RwLock<HashMap<String, Vec<Arc<dyn EventHandler>>>>,
    filters: RwLock<Vec<EventFilter>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn on(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.entry(event_type.to_string()).or_default().push(handler);
    }

    pub async fn add_filter(&self, filter: EventFilter) {
        self.filters.write().await.push(filter);
    }

    /// Appends the outbox row, then fans out in-process. If no listener is
    /// registered for `event_type`, the row is marked processed immediately —
    /// there is nothing for `EventProcessor` to deliver.
    pub async fn emit(&self, db: &DatabaseConnection, event_type: &str, data: serde_json::Value) -> EngineResult<bool> {
        for filter in self.filters.read().await.iter() {
            if !filter(event_type, &data) {
                return Ok(false);
            }
        }

        let event = Event::append(db, event_type, data.clone()).await?;

        let handlers = self.handlers.read().await;
        match handlers.get(event_type) {
            Some(listeners) if !listeners.is_empty() => {
                for listener in listeners {
                    if let Err(e) = listener.handle(&data).await {
                        tracing::warn!(event_type, error = %e, "in-process event listener failed");
                    }
                }
            }
            _ => {
                Event::mark_processed(db, event.id).await?;
            }
        }

        Ok(true)
    }

    /// Resets `processed=false` on an event and re-dispatches it. Used by
    /// operators to force redelivery of a successfully-processed event.
    pub async fn replay(&self, db: &DatabaseConnection, id: Uuid) -> EngineResult<()> {
        use crate::models::_entities::{events, prelude::Events};
        use sea_orm::{ActiveModelTrait, EntityTrait, Set};

        let model = Events::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| crate::errors::EngineError::not_found("event not found"))?;
        let event_type = model.event_type.clone();
        let data = model.data.clone();

        let mut active: events::ActiveModel = model.into();
        active.processed = Set(false);
        active.error = Set(None);
        active.update(db).await?;

        let handlers = self.handlers.read().await;
        if let Some(listeners) = handlers.get(&event_type) {
            for listener in listeners {
                if let Err(e) = listener.handle(&data).await {
                    tracing::warn!(event_type = %event_type, error = %e, "replayed event listener failed");
                }
            }
        }

        Ok(())
    }
}
