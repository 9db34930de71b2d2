//! Orchestrator tying together the idempotency check, the per-transaction
//! lock, the provider call, and the failure routing described in §4.1.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::{CreateTransactionRequest, Transaction, TransactionQueryFilters, TransactionStatus};
use crate::services::customer_limits::CustomerLimitsService;
use crate::services::dead_letter_queue::DeadLetterQueue;
use crate::services::event_emitter::EventEmitter;
use crate::services::payment_provider::{AuthorizeRequest, PaymentProviderPort};
use crate::services::record_locker::RecordLocker;
use crate::services::recovery_manager::RecoveryManager;
use crate::services::retry_manager::{RetryManager, RetryTarget};

pub struct TransactionManager {
    db: DatabaseConnection,
    provider: Arc<dyn PaymentProviderPort>,
    emitter: Arc<EventEmitter>,
    lock_ttl: chrono::Duration,
    retry_manager: OnceLock<Arc<RetryManager>>,
    recovery_manager: OnceLock<Arc<RecoveryManager>>,
}

impl TransactionManager {
    pub fn new(db: DatabaseConnection, provider: Arc<dyn PaymentProviderPort>, emitter: Arc<EventEmitter>, lock_ttl: chrono::Duration) -> Arc<Self> {
        Arc::new(Self { db, provider, emitter, lock_ttl, retry_manager: OnceLock::new(), recovery_manager: OnceLock::new() })
    }

    /// Wiring happens after construction because `RetryManager` needs an
    /// `Arc<dyn RetryTarget>` pointing back at this manager.
    pub fn wire(&self, retry_manager: Arc<RetryManager>, recovery_manager: Arc<RecoveryManager>) {
        let _ = self.retry_manager.set(retry_manager);
        let _ = self.recovery_manager.set(recovery_manager);
    }

    /// Controllers need a raw handle to pass into `RetryManager`/`DeadLetterQueue`
    /// calls that are not themselves exposed through this manager.
    pub fn db_handle(&self) -> DatabaseConnection {
        self.db.clone()
    }

    fn retry_manager(&self) -> &Arc<RetryManager> {
        self.retry_manager.get().expect("TransactionManager::wire was never called")
    }

    fn recovery_manager(&self) -> &Arc<RecoveryManager> {
        self.recovery_manager.get().expect("TransactionManager::wire was never called")
    }

    pub async fn check_transaction_limits(&self, customer_id: &str, amount: rust_decimal::Decimal, currency: &str) -> EngineResult<bool> {
        CustomerLimitsService::check(&self.db, customer_id, amount, currency).await
    }

    pub async fn get(&self, id: Uuid) -> EngineResult<Transaction> {
        Transaction::find_by_id(&self.db, id).await?.ok_or_else(|| EngineError::not_found("transaction not found"))
    }

    pub async fn query(&self, customer_id: &str, filters: &TransactionQueryFilters) -> EngineResult<Vec<Transaction>> {
        Transaction::query(&self.db, customer_id, filters).await
    }

    /// Idempotent: a second call with the same key returns the prior
    /// transaction without any provider call or state change.
    pub async fn begin(&self, req: CreateTransactionRequest) -> EngineResult<Transaction> {
        Transaction::validate_amount_and_currency(req.amount, &req.currency)?;
        Transaction::validate_idempotency_key(&req.idempotency_key)?;

        if let Some(existing) = Transaction::find_by_idempotency_key(&self.db, &req.idempotency_key).await? {
            if !existing.same_request(&req) {
                return Err(EngineError::conflict("idempotency_key_conflict", "idempotency key reused with a different request body"));
            }
            return Ok(existing);
        }

        let tx = match Transaction::insert_pending(&self.db, &req).await {
            Ok(tx) => tx,
            // Lost the race against a concurrent begin() with the same key.
            Err(EngineError::Conflict { code, .. }) if code == "idempotency_key_conflict" => {
                return Transaction::find_by_idempotency_key(&self.db, &req.idempotency_key)
                    .await?
                    .ok_or_else(|| EngineError::internal("idempotency race lost but no transaction found"));
            }
            Err(e) => return Err(e),
        };

        self.emitter.emit(&self.db, "transaction.created", serde_json::json!({ "transactionId": tx.id })).await?;

        let lock_key = format!("transaction:{}", tx.id);
        RecordLocker::with_lock(&self.db, &lock_key, self.lock_ttl, || self.authorize(tx.id)).await
    }

    /// Transitions PENDING → PROCESSING, calls the provider, and lands on
    /// COMPLETED or FAILED. Callers hold the per-transaction lock.
    async fn authorize(&self, id: Uuid) -> EngineResult<Transaction> {
        let tx = self.get(id).await?;
        let processing = Transaction::apply_transition(&self.db, id, TransactionStatus::Processing, None, None, None).await?;

        let request = AuthorizeRequest {
            transaction_id: processing.id,
            amount: processing.amount,
            currency: processing.currency.clone(),
            payment_method_id: processing.payment_method_id.clone(),
            idempotency_key: processing.idempotency_key.clone(),
        };

        match self.provider.authorize(&request).await {
            Ok(response) => {
                let mut metadata = processing.metadata.clone();
                if let Some(obj) = metadata.as_object_mut() {
                    obj.insert("providerReference".to_string(), serde_json::json!(response.provider_reference));
                }
                let completed = Transaction::apply_transition(&self.db, id, TransactionStatus::Completed, None, Some(metadata), None).await?;
                self.emitter.emit(&self.db, "transaction.completed", serde_json::json!({ "transactionId": id })).await?;
                Ok(completed)
            }
            Err(error) => self.handle_failure(&processing, error, "transaction.failed").await,
        }
    }

    /// Common failure routing used by both `begin` and `execute_retry`:
    /// persist FAILED + the error, emit, then hand off per §4.1 semantics.
    async fn handle_failure(&self, tx: &Transaction, error: TransactionError, failed_event: &str) -> EngineResult<Transaction> {
        let failed = Transaction::apply_transition(&self.db, tx.id, TransactionStatus::Failed, Some(error.clone()), None, None).await?;
        self.emitter
            .emit(&self.db, failed_event, serde_json::json!({ "transactionId": tx.id, "code": error.code }))
            .await?;

        if error.retryable {
            self.retry_manager().schedule_retry(&self.db, &failed, &error).await
        } else if error.recoverable {
            self.recovery_manager().initiate_recovery(&failed, &error).await
        } else {
            DeadLetterQueue::enqueue(&self.db, failed.id, &error).await?;
            self.emitter
                .emit(&self.db, "transaction.moved_to_dlq", serde_json::json!({ "transactionId": failed.id }))
                .await?;
            Ok(failed)
        }
    }

    /// Entry point for a provider webhook reporting an out-of-band decline on
    /// a transaction still in flight. Routes through the same failure path
    /// as an inline provider response.
    pub async fn handle_webhook_failure(&self, id: Uuid, error: TransactionError) -> EngineResult<Transaction> {
        let lock_key = format!("transaction:{}", id);
        RecordLocker::with_lock(&self.db, &lock_key, self.lock_ttl, || async {
            let tx = self.get(id).await?;
            self.handle_failure(&tx, error, "transaction.failed").await
        })
        .await
    }

    /// Rejects transitions not allowed by the state graph.
    pub async fn update_status(&self, id: Uuid, new_status: TransactionStatus, metadata: Option<serde_json::Value>) -> EngineResult<Transaction> {
        let lock_key = format!("transaction:{}", id);
        RecordLocker::with_lock(&self.db, &lock_key, self.lock_ttl, || async {
            Transaction::apply_transition(&self.db, id, new_status, None, metadata, None).await
        })
        .await
    }
}

#[async_trait]
impl RetryTarget for TransactionManager {
    /// Invoked by `RetryManager` once its timer fires. RECOVERY_PENDING →
    /// RECOVERY_IN_PROGRESS → {COMPLETED | FAILED}.
    async fn execute_retry(&self, id: Uuid) {
        if let Err(e) = self.execute_retry_inner(id).await {
            tracing::error!(transaction_id = %id, error = %e, "retry execution failed");
        }
    }
}

impl TransactionManager {
    async fn execute_retry_inner(&self, id: Uuid) -> EngineResult<Transaction> {
        let lock_key = format!("transaction:{}", id);
        RecordLocker::with_lock(&self.db, &lock_key, self.lock_ttl, || async {
            let tx = self.get(id).await?;
            if tx.status != TransactionStatus::RecoveryPending {
                return Err(EngineError::conflict("state_conflict", "transaction is not pending retry"));
            }

            self.emitter.emit(&self.db, "transaction.retry_started", serde_json::json!({ "transactionId": id })).await?;
            let in_progress = Transaction::apply_transition(&self.db, id, TransactionStatus::RecoveryInProgress, None, None, None).await?;

            let request = AuthorizeRequest {
                transaction_id: in_progress.id,
                amount: in_progress.amount,
                currency: in_progress.currency.clone(),
                payment_method_id: in_progress.payment_method_id.clone(),
                idempotency_key: in_progress.idempotency_key.clone(),
            };

            match self.provider.authorize(&request).await {
                Ok(response) => {
                    let mut metadata = in_progress.metadata.clone();
                    if let Some(obj) = metadata.as_object_mut() {
                        obj.insert("providerReference".to_string(), serde_json::json!(response.provider_reference));
                    }
                    let completed = Transaction::apply_transition(&self.db, id, TransactionStatus::Completed, None, Some(metadata), None).await?;
                    self.emitter
                        .emit(&self.db, "transaction.completed_after_retry", serde_json::json!({ "transactionId": id }))
                        .await?;
                    Ok(completed)
                }
                Err(error) => self.handle_failure(&in_progress, error, "transaction.failed_after_retry").await,
            }
        })
        .await
    }
}
