//! Background loop draining the outbox (§4.5). Each tick pulls a bounded
//! batch of due events, dispatches to a registered handler by type, and
//! applies backoff on failure until `maxRetries` is exhausted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::config::EventProcessorConfig;
use crate::errors::EngineResult;
use crate::models::Event;
use crate::services::event_emitter::EventHandler;

pub struct EventProcessor {
    db: DatabaseConnection,
    config: EventProcessorConfig,
    handlers: RwLock<HashMap<String, Arc<dyn EventHandler>>>,
    running: AtomicBool,
}

impl EventProcessor {
    pub fn new(db: DatabaseConnection, config: EventProcessorConfig) -> Arc<Self> {
        Arc::new(Self { db, config, handlers: RwLock::new(HashMap::new()), running: AtomicBool::new(false) })
    }

    pub async fn register_handler(&self, event_type: &str, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.insert(event_type.to_string(), handler);
    }

    /// Starting is idempotent: calling `start` on an already-running
    /// processor is a no-op rather than spawning a second loop.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let processor = Arc::clone(self);
        tokio::spawn(async move {
            info!(interval_ms = processor.config.tick_interval_ms, "event processor started");
            let mut interval = tokio::time::interval(std::time::Duration::from_millis(processor.config.tick_interval_ms));

            while processor.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if let Err(e) = processor.tick().await {
                    error!(error = %e, "event processor tick failed");
                }
            }

            info!("event processor stopped");
        });
    }

    /// Signals the loop to exit after its current tick, draining any
    /// in-flight handler calls before returning.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn tick(&self) -> EngineResult<()> {
        let now = chrono::Utc::now().naive_utc();
        let due = Event::find_due(&self.db, now, self.config.batch_size).await?;

        for event in due {
            self.dispatch(event).await;
        }

        Ok(())
    }

    async fn dispatch(&self, event: Event) {
        let handler = self.handlers.read().await.get(&event.event_type).cloned();

        let Some(handler) = handler else {
            debug!(event_id = %event.id, event_type = %event.event_type, "no handler registered, marking processed");
            if let Err(e) = Event::mark_processed(&self.db, event.id).await {
                error!(event_id = %event.id, error = %e, "failed to mark unhandled event processed");
            }
            return;
        };

        match handler.handle(&event.data).await {
            Ok(()) => {
                if let Err(e) = Event::mark_processed(&self.db, event.id).await {
                    error!(event_id = %event.id, error = %e, "failed to mark event processed");
                }
            }
            Err(err) => {
                let next_retry_count = event.retry_count + 1;
                if next_retry_count >= self.config.max_retries as i32 {
                    warn!(event_id = %event.id, event_type = %event.event_type, "event exhausted retries, marking permanently failed");
                    if let Err(e) = Event::mark_permanently_failed(&self.db, event.id, &err.to_string()).await {
                        error!(event_id = %event.id, error = %e, "failed to mark event permanently failed");
                    }
                } else {
                    let delay_ms = (1000u64.saturating_mul(1u64 << (next_retry_count.max(1) as u32 - 1))).min(60_000);
                    let next_retry_at = chrono::Utc::now().naive_utc() + chrono::Duration::milliseconds(delay_ms as i64);
                    if let Err(e) = Event::mark_for_retry(&self.db, event.id, &err.to_string(), next_retry_count, next_retry_at).await {
                        error!(event_id = %event.id, error = %e, "failed to schedule event retry");
                    }
                }
            }
        }
    }

    /// Deletes successfully-delivered events older than `older_than`.
    pub async fn prune(&self, older_than: chrono::NaiveDateTime) -> EngineResult<u64> {
        Event::prune_processed(&self.db, older_than).await
    }
}
