//! Recovery strategy selection and execution (§4.3). Strategies are tried in
//! order; the first whose `can_handle` returns true owns the recovery.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::{Transaction, TransactionStatus};
use crate::services::dead_letter_queue::DeadLetterQueue;
use crate::services::event_emitter::EventEmitter;
use crate::services::record_locker::RecordLocker;
use crate::services::retry_manager::RetryManager;

pub struct RecoveryOutcome {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<TransactionError>,
}

#[async_trait]
pub trait RecoveryStrategy: Send + Sync {
    fn name(&self) -> &str;
    fn can_handle(&self, error: &TransactionError) -> bool;
    async fn execute(&self, tx: &Transaction) -> RecoveryOutcome;
}

/// Recoverable-but-not-automatically-retryable provider declines: marks the
/// transaction for manual review rather than closing it silently.
pub struct ManualReviewStrategy;

#[async_trait]
impl RecoveryStrategy for ManualReviewStrategy {
    fn name(&self) -> &str {
        "manual_review"
    }

    fn can_handle(&self, error: &TransactionError) -> bool {
        error.recoverable && !error.retryable
    }

    async fn execute(&self, _tx: &Transaction) -> RecoveryOutcome {
        RecoveryOutcome {
            success: false,
            data: None,
            error: Some(TransactionError::new(
                "MANUAL_REVIEW_REQUIRED",
                "recoverable error requires operator intervention",
                false,
                false,
            )),
        }
    }
}

pub struct RecoveryManager {
    db: DatabaseConnection,
    lock_ttl: chrono::Duration,
    emitter: Arc<EventEmitter>,
    retry_manager: Arc<RetryManager>,
    strategies: Vec<Arc<dyn RecoveryStrategy>>,
}

impl RecoveryManager {
    pub fn new(db: DatabaseConnection, lock_ttl: chrono::Duration, emitter: Arc<EventEmitter>, retry_manager: Arc<RetryManager>, strategies: Vec<Arc<dyn RecoveryStrategy>>) -> Self {
        Self { db, lock_ttl, emitter, retry_manager, strategies }
    }

    pub async fn initiate_recovery(&self, tx: &Transaction, error: &TransactionError) -> EngineResult<Transaction> {
        if matches!(tx.status, TransactionStatus::Completed | TransactionStatus::RolledBack) {
            return Err(EngineError::conflict("state_conflict", "cannot recover a terminal transaction"));
        }

        let lock_key = format!("transaction:{}", tx.id);
        let db = self.db.clone();

        self.emitter
            .emit(&db, "transaction.recovery_started", serde_json::json!({ "transactionId": tx.id }))
            .await?;

        RecordLocker::with_lock(&db.clone(), &lock_key, self.lock_ttl, || async move {
            // The graph only allows RECOVERY_IN_PROGRESS from RECOVERY_PENDING;
            // pass through it when entering recovery directly from FAILED.
            if tx.status != TransactionStatus::RecoveryPending {
                Transaction::apply_transition(&db, tx.id, TransactionStatus::RecoveryPending, None, None, None).await?;
            }
            let current = Transaction::apply_transition(&db, tx.id, TransactionStatus::RecoveryInProgress, None, None, None).await?;

            let strategy = self.strategies.iter().find(|s| s.can_handle(error));

            let Some(strategy) = strategy else {
                return self.fail_to_dlq(&db, &current, error).await;
            };

            let outcome = strategy.execute(&current).await;

            if outcome.success {
                let mut metadata = current.metadata.clone();
                if let (Some(obj), Some(data)) = (metadata.as_object_mut(), outcome.data.as_ref().and_then(|d| d.as_object())) {
                    for (k, v) in data {
                        obj.insert(k.clone(), v.clone());
                    }
                }
                let updated = Transaction::apply_transition(&db, tx.id, TransactionStatus::Completed, None, Some(metadata), None).await?;
                self.emitter
                    .emit(&db, "transaction.recovery_completed", serde_json::json!({ "transactionId": tx.id, "strategy": strategy.name() }))
                    .await?;
                Ok(updated)
            } else {
                let strategy_error = outcome.error.unwrap_or_else(|| TransactionError::system_error("recovery strategy failed without detail"));
                if strategy_error.retryable {
                    // scheduleRetry requires FAILED or RECOVERY_PENDING; land
                    // there first since we are currently RECOVERY_IN_PROGRESS.
                    let failed = Transaction::apply_transition(&db, tx.id, TransactionStatus::Failed, Some(strategy_error.clone()), None, None).await?;
                    self.retry_manager.schedule_retry(&db, &failed, &strategy_error).await
                } else {
                    self.fail_to_dlq(&db, &current, &strategy_error).await
                }
            }
        })
        .await
    }

    async fn fail_to_dlq(&self, db: &DatabaseConnection, tx: &Transaction, error: &TransactionError) -> EngineResult<Transaction> {
        let updated = Transaction::apply_transition(db, tx.id, TransactionStatus::Failed, Some(error.clone()), None, None).await?;
        DeadLetterQueue::enqueue(db, tx.id, error).await?;
        self.emitter
            .emit(db, "transaction.moved_to_dlq", serde_json::json!({ "transactionId": tx.id }))
            .await?;
        Ok(updated)
    }

    /// Removes `id` from the DLQ and re-runs recovery with a fresh attempt
    /// counter, per the operator-initiated reprocess hook.
    pub async fn reprocess_from_dead_letter(&self, id: Uuid) -> EngineResult<Transaction> {
        let entry = DeadLetterQueue::get(&self.db, id).await?;
        let tx = Transaction::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| EngineError::not_found("transaction not found"))?;

        Transaction::apply_transition(&self.db, id, TransactionStatus::RecoveryPending, None, None, Some(0)).await?;
        DeadLetterQueue::remove(&self.db, id).await?;

        self.emitter
            .emit(&self.db, "transaction.reprocessing", serde_json::json!({ "transactionId": id }))
            .await?;

        let refreshed = Transaction::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| EngineError::not_found("transaction not found"))?;
        self.initiate_recovery(&refreshed, &entry.error).await
    }

    pub async fn get_dead_letter_queue_stats(&self) -> EngineResult<HashMap<String, u64>> {
        DeadLetterQueue::stats_by_code(&self.db).await
    }
}
