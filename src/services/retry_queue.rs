//! In-process timer map scheduling retry callbacks by transaction id (§4.6).
//! Durable state lives in `transactions` (status=RECOVERY_PENDING); this
//! queue only owns the wall-clock wakeup, and is rebuilt from the database
//! on restart rather than persisted itself.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[async_trait]
pub trait RetryConsumer: Send + Sync {
    async fn on_due(&self, id: Uuid);
}

#[derive(Default)]
pub struct RetryQueue {
    timers: Mutex<HashMap<Uuid, JoinHandle<()>>>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `id` to fire after `delay`, cancelling any timer already
    /// pending for it. On fire, notifies `consumer` and drops its own entry.
    pub async fn enqueue(self: &Arc<Self>, id: Uuid, delay: std::time::Duration, consumer: Arc<dyn RetryConsumer>) {
        let mut timers = self.timers.lock().await;
        if let Some(existing) = timers.remove(&id) {
            existing.abort();
        }

        let queue = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            consumer.on_due(id).await;
            queue.timers.lock().await.remove(&id);
        });

        timers.insert(id, handle);
    }

    pub async fn dequeue(&self, id: Uuid) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.remove(&id) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub async fn clear(&self) {
        let mut timers = self.timers.lock().await;
        for (_, handle) in timers.drain() {
            handle.abort();
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.timers.lock().await.len()
    }

    /// Rebuilds pending timers after a restart by scanning transactions
    /// parked in RECOVERY_PENDING with a stored `nextRetryAt` in metadata.
    pub async fn rebuild_from_store(self: &Arc<Self>, db: &DatabaseConnection, consumer: Arc<dyn RetryConsumer>) -> crate::errors::EngineResult<usize> {
        use crate::models::{Transaction, TransactionStatus};
        use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

        let models = crate::models::_entities::prelude::Transactions::find()
            .filter(crate::models::_entities::transactions::Column::Status.eq(TransactionStatus::RecoveryPending.as_str()))
            .all(db)
            .await?;

        let mut rebuilt = 0;
        for model in models {
            let tx = Transaction::try_from(model)?;
            let next_retry_at = tx
                .metadata
                .get("nextRetryAt")
                .and_then(|v| v.as_str())
                .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.naive_utc());

            let delay = match next_retry_at {
                Some(at) => {
                    let now = chrono::Utc::now().naive_utc();
                    if at > now {
                        (at - now).to_std().unwrap_or(std::time::Duration::ZERO)
                    } else {
                        std::time::Duration::ZERO
                    }
                }
                None => std::time::Duration::ZERO,
            };

            self.enqueue(tx.id, delay, Arc::clone(&consumer)).await;
            rebuilt += 1;
        }

        Ok(rebuilt)
    }
}
