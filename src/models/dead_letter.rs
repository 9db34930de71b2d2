use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineResult, TransactionError};
use crate::models::_entities::{dead_letter, prelude::*};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub transaction_id: Uuid,
    pub error: TransactionError,
    pub enqueued_at: chrono::NaiveDateTime,
}

impl TryFrom<dead_letter::Model> for DeadLetterEntry {
    type Error = crate::errors::EngineError;

    fn try_from(model: dead_letter::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            transaction_id: model.transaction_id,
            error: serde_json::from_value(model.error)
                .map_err(|e| crate::errors::EngineError::internal(format!("corrupt dead letter error column: {e}")))?,
            enqueued_at: model.enqueued_at,
        })
    }
}

impl DeadLetterEntry {
    pub async fn enqueue<C: ConnectionTrait>(db: &C, transaction_id: Uuid, error: &TransactionError) -> EngineResult<DeadLetterEntry> {
        let now = chrono::Utc::now().naive_utc();
        let active = dead_letter::ActiveModel {
            transaction_id: Set(transaction_id),
            error: Set(serde_json::to_value(error).unwrap_or(serde_json::json!({}))),
            enqueued_at: Set(now),
        };
        let model = active.insert(db).await?;
        DeadLetterEntry::try_from(model)
    }

    pub async fn list(db: &DatabaseConnection, limit: u64, offset: u64) -> EngineResult<Vec<DeadLetterEntry>> {
        let models = DeadLetter::find()
            .order_by_desc(dead_letter::Column::EnqueuedAt)
            .limit(limit)
            .offset(offset)
            .all(db)
            .await?;
        models.into_iter().map(DeadLetterEntry::try_from).collect()
    }

    pub async fn remove(db: &DatabaseConnection, transaction_id: Uuid) -> EngineResult<()> {
        DeadLetter::delete_by_id(transaction_id).exec(db).await?;
        Ok(())
    }
}
