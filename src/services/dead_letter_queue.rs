//! Durable holding area for transactions that exhausted retries or hit a
//! terminal provider decline (§4.3, §4.7 data model).

use std::collections::HashMap;

use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::DeadLetterEntry;

pub struct DeadLetterQueue;

impl DeadLetterQueue {
    pub async fn enqueue(db: &DatabaseConnection, transaction_id: Uuid, error: &TransactionError) -> EngineResult<DeadLetterEntry> {
        tracing::error!(transaction_id = %transaction_id, code = %error.code, "transaction moved to dead letter queue");
        DeadLetterEntry::enqueue(db, transaction_id, error).await
    }

    pub async fn list(db: &DatabaseConnection, limit: u64, offset: u64) -> EngineResult<Vec<DeadLetterEntry>> {
        DeadLetterEntry::list(db, limit, offset).await
    }

    /// Removes `transaction_id` from the DLQ. Callers are expected to have
    /// already reset the transaction's retry counter before re-attempting.
    pub async fn remove(db: &DatabaseConnection, transaction_id: Uuid) -> EngineResult<()> {
        DeadLetterEntry::remove(db, transaction_id).await
    }

    pub async fn stats_by_code(db: &DatabaseConnection) -> EngineResult<HashMap<String, u64>> {
        let entries = DeadLetterEntry::list(db, 10_000, 0).await?;
        let mut stats = HashMap::new();
        for entry in entries {
            *stats.entry(entry.error.code).or_insert(0) += 1;
        }
        Ok(stats)
    }

    pub async fn get(db: &DatabaseConnection, transaction_id: Uuid) -> EngineResult<DeadLetterEntry> {
        Self::list(db, 10_000, 0)
            .await?
            .into_iter()
            .find(|e| e.transaction_id == transaction_id)
            .ok_or_else(|| EngineError::not_found("dead letter entry not found"))
    }
}
