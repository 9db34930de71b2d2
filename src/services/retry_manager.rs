//! Policy-driven retry scheduling (§4.2). Computes backoff, advances the
//! state machine to RECOVERY_PENDING, and arms the `RetryQueue` timer; the
//! actual retry attempt happens in whatever implements `RetryTarget`
//! (`TransactionManager::execute_retry`) once the timer fires.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::RetryPolicyConfig;
use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::{Transaction, TransactionStatus};
use crate::services::dead_letter_queue::DeadLetterQueue;
use crate::services::event_emitter::EventEmitter;
use crate::services::retry_queue::{RetryConsumer, RetryQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Computes the base delay for `retry_count` attempts made so far, per
/// policy, then applies the required ±10% jitter once — the caller does not
/// re-roll jitter on crash-recovery requeue.
pub fn compute_delay(policy: &RetryPolicyConfig, retry_count: u32) -> std::time::Duration {
    let base_ms = match policy.backoff {
        BackoffKind::Fixed => policy.initial_delay_ms,
        BackoffKind::Exponential => {
            let exp = retry_count.saturating_sub(1).min(32);
            policy.initial_delay_ms.saturating_mul(1u64 << exp)
        }
    }
    .min(policy.max_delay_ms);

    let jitter_fraction = rand::thread_rng().gen_range(-0.1..=0.1);
    let jittered_ms = (base_ms as f64 * (1.0 + jitter_fraction)).max(0.0) as u64;
    std::time::Duration::from_millis(jittered_ms)
}

#[async_trait]
pub trait RetryTarget: Send + Sync {
    async fn execute_retry(&self, id: Uuid);
}

pub struct RetryManager {
    queue: Arc<RetryQueue>,
    emitter: Arc<EventEmitter>,
    policy: RetryPolicyConfig,
    target: Arc<dyn RetryTarget>,
}

#[async_trait]
impl RetryConsumer for RetryManager {
    async fn on_due(&self, id: Uuid) {
        self.target.execute_retry(id).await;
    }
}

impl RetryManager {
    pub fn new(queue: Arc<RetryQueue>, emitter: Arc<EventEmitter>, policy: RetryPolicyConfig, target: Arc<dyn RetryTarget>) -> Arc<Self> {
        Arc::new(Self { queue, emitter, policy, target })
    }

    /// Preconditions: `tx.status ∈ {FAILED, RECOVERY_PENDING}` and
    /// `error.retryable`. On exhaustion the transaction is forced to FAILED
    /// and routed straight to the dead letter queue.
    pub async fn schedule_retry(self: &Arc<Self>, db: &DatabaseConnection, tx: &Transaction, error: &TransactionError) -> EngineResult<Transaction> {
        if !matches!(tx.status, TransactionStatus::Failed | TransactionStatus::RecoveryPending) {
            return Err(EngineError::conflict("state_conflict", "transaction is not in a retryable state"));
        }
        if !error.retryable {
            return Err(EngineError::validation("error is not retryable"));
        }

        let next_retry_count = tx.retry_count as u32 + 1;

        if next_retry_count > self.policy.max_attempts {
            let exhausted_error = TransactionError::retry_limit_exceeded();
            let updated = Transaction::apply_transition(
                db,
                tx.id,
                TransactionStatus::Failed,
                Some(exhausted_error.clone()),
                None,
                Some(tx.retry_count),
            )
            .await?;

            self.emitter
                .emit(db, "transaction.retry_exhausted", serde_json::json!({ "transactionId": tx.id }))
                .await?;

            DeadLetterQueue::enqueue(db, tx.id, &exhausted_error).await?;
            self.emitter
                .emit(db, "transaction.moved_to_dlq", serde_json::json!({ "transactionId": tx.id }))
                .await?;

            return Ok(updated);
        }

        let delay = compute_delay(&self.policy, next_retry_count);
        let next_retry_at = chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();

        let mut metadata = tx.metadata.clone();
        if let Some(obj) = metadata.as_object_mut() {
            obj.insert("nextRetryAt".to_string(), serde_json::json!(next_retry_at.to_rfc3339()));
        }

        let updated = Transaction::apply_transition(
            db,
            tx.id,
            TransactionStatus::RecoveryPending,
            Some(error.clone()),
            Some(metadata),
            Some(next_retry_count as i32),
        )
        .await?;

        self.queue.enqueue(tx.id, delay, Arc::clone(self) as Arc<dyn RetryConsumer>).await;

        self.emitter
            .emit(
                db,
                "transaction.retry_scheduled",
                serde_json::json!({ "transactionId": tx.id, "retryCount": next_retry_count, "delayMs": delay.as_millis() }),
            )
            .await?;

        Ok(updated)
    }

    /// Removes any pending timer and forces the transaction to FAILED with
    /// `metadata.retryCancelled=true`.
    pub async fn cancel_retry(&self, db: &DatabaseConnection, id: Uuid) -> EngineResult<bool> {
        let had_timer = self.queue.dequeue(id).await;

        let tx = Transaction::find_by_id(db, id)
            .await?
            .ok_or_else(|| EngineError::not_found("transaction not found"))?;

        if tx.status == TransactionStatus::RecoveryPending {
            let mut metadata = tx.metadata.clone();
            if let Some(obj) = metadata.as_object_mut() {
                obj.insert("retryCancelled".to_string(), serde_json::json!(true));
            }
            Transaction::apply_transition(db, id, TransactionStatus::Failed, tx.error.clone(), Some(metadata), None).await?;
        }

        Ok(had_timer)
    }

    pub async fn get_retry_stats(&self, db: &DatabaseConnection) -> EngineResult<HashMap<String, u64>> {
        let mut stats = HashMap::new();
        stats.insert("pendingTimers".to_string(), self.queue.pending_count().await as u64);

        for status in [TransactionStatus::RecoveryPending, TransactionStatus::RecoveryInProgress] {
            let count = Transaction::count_by_status(db, status).await?;
            stats.insert(status.as_str().to_lowercase(), count);
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(backoff: BackoffKind) -> RetryPolicyConfig {
        RetryPolicyConfig { max_attempts: 5, backoff, initial_delay_ms: 1000, max_delay_ms: 60_000 }
    }

    #[test]
    fn exponential_backoff_is_monotone_up_to_cap() {
        let p = policy(BackoffKind::Exponential);
        let mut last_upper_bound = 0u64;
        for retry_count in 1..=10 {
            let base = (p.initial_delay_ms.saturating_mul(1u64 << (retry_count - 1).min(32))).min(p.max_delay_ms);
            let upper_bound = (base as f64 * 1.1).ceil() as u64;
            assert!(upper_bound + 1 >= last_upper_bound, "retry {retry_count}: {upper_bound} should not shrink vs {last_upper_bound}");
            last_upper_bound = upper_bound;

            let delay = compute_delay(&p, retry_count).as_millis() as u64;
            assert!(delay <= upper_bound, "retry {retry_count}: delay {delay} exceeded bound {upper_bound}");
        }
    }

    #[test]
    fn exponential_backoff_respects_max_delay() {
        let p = policy(BackoffKind::Exponential);
        let delay = compute_delay(&p, 20).as_millis() as u64;
        assert!(delay <= (p.max_delay_ms as f64 * 1.1).ceil() as u64);
    }

    #[test]
    fn fixed_backoff_stays_near_initial_delay() {
        let p = policy(BackoffKind::Fixed);
        for retry_count in 1..=5 {
            let delay = compute_delay(&p, retry_count).as_millis() as u64;
            assert!(delay <= (p.initial_delay_ms as f64 * 1.1).ceil() as u64);
            assert!(delay >= (p.initial_delay_ms as f64 * 0.9).floor() as u64);
        }
    }
}
