use sea_orm::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::_entities::{prelude::*, transactions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Payment,
    Refund,
    Chargeback,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payment => "PAYMENT",
            Self::Refund => "REFUND",
            Self::Chargeback => "CHARGEBACK",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "PAYMENT" => Ok(Self::Payment),
            "REFUND" => Ok(Self::Refund),
            "CHARGEBACK" => Ok(Self::Chargeback),
            other => Err(EngineError::validation(format!("unknown transaction type: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    RolledBack,
    RecoveryPending,
    RecoveryInProgress,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::RolledBack => "ROLLED_BACK",
            Self::RecoveryPending => "RECOVERY_PENDING",
            Self::RecoveryInProgress => "RECOVERY_IN_PROGRESS",
        }
    }

    pub fn parse(s: &str) -> EngineResult<Self> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PROCESSING" => Ok(Self::Processing),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "ROLLED_BACK" => Ok(Self::RolledBack),
            "RECOVERY_PENDING" => Ok(Self::RecoveryPending),
            "RECOVERY_IN_PROGRESS" => Ok(Self::RecoveryInProgress),
            other => Err(EngineError::validation(format!("unknown transaction status: {other}"))),
        }
    }

    /// The state graph from spec §4.1. Out-of-graph transitions are rejected.
    pub fn can_transition_to(self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Failed)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, RolledBack)
                | (Failed, RecoveryPending)
                | (RecoveryPending, RecoveryInProgress)
                | (RecoveryInProgress, Completed)
                | (RecoveryInProgress, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::RolledBack)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub idempotency_key: String,
    pub retry_count: i32,
    pub metadata: serde_json::Value,
    pub error: Option<TransactionError>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
    pub completed_at: Option<chrono::NaiveDateTime>,
    pub failed_at: Option<chrono::NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub struct CreateTransactionRequest {
    pub transaction_type: TransactionType,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub idempotency_key: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionQueryFilters {
    pub status: Option<TransactionStatus>,
    pub transaction_type: Option<TransactionType>,
    pub start_date: Option<chrono::NaiveDateTime>,
    pub end_date: Option<chrono::NaiveDateTime>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl TryFrom<transactions::Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: transactions::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            transaction_type: TransactionType::parse(&model.transaction_type)?,
            status: TransactionStatus::parse(&model.status)?,
            amount: model.amount,
            currency: model.currency,
            customer_id: model.customer_id,
            payment_method_id: model.payment_method_id,
            idempotency_key: model.idempotency_key,
            retry_count: model.retry_count,
            metadata: model.metadata.unwrap_or(serde_json::json!({})),
            error: model
                .error
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| EngineError::internal(format!("corrupt transaction error column: {e}")))?,
            created_at: model.created_at,
            updated_at: model.updated_at,
            completed_at: model.completed_at,
            failed_at: model.failed_at,
        })
    }
}

impl Transaction {
    pub fn validate_amount_and_currency(amount: rust_decimal::Decimal, currency: &str) -> EngineResult<()> {
        if amount <= rust_decimal::Decimal::ZERO {
            return Err(EngineError::validation("amount must be positive"));
        }
        if amount.scale() > 2 {
            return Err(EngineError::validation("amount must have at most 2 fractional digits"));
        }
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(EngineError::validation("currency must be 3 uppercase letters (ISO 4217)"));
        }
        Ok(())
    }

    pub fn validate_idempotency_key(key: &str) -> EngineResult<()> {
        if key.len() < 8 {
            return Err(EngineError::validation("idempotency key must be at least 8 characters"));
        }
        Ok(())
    }

    /// Returns true if `other` is the same logical request as this transaction
    /// (used to distinguish an idempotent replay from a 409 conflict).
    pub fn same_request(&self, req: &CreateTransactionRequest) -> bool {
        self.transaction_type == req.transaction_type
            && self.amount == req.amount
            && self.currency == req.currency
            && self.customer_id == req.customer_id
            && self.payment_method_id == req.payment_method_id
    }

    pub async fn find_by_idempotency_key(db: &DatabaseConnection, key: &str) -> EngineResult<Option<Transaction>> {
        let model = Transactions::find()
            .filter(transactions::Column::IdempotencyKey.eq(key))
            .one(db)
            .await?;
        model.map(Transaction::try_from).transpose()
    }

    pub async fn find_by_id(db: &DatabaseConnection, id: Uuid) -> EngineResult<Option<Transaction>> {
        let model = Transactions::find_by_id(id).one(db).await?;
        model.map(Transaction::try_from).transpose()
    }

    pub async fn insert_pending(db: &DatabaseConnection, req: &CreateTransactionRequest) -> EngineResult<Transaction> {
        let now = chrono::Utc::now().naive_utc();
        let active = transactions::ActiveModel {
            id: Set(Uuid::new_v4()),
            transaction_type: Set(req.transaction_type.as_str().to_string()),
            status: Set(TransactionStatus::Pending.as_str().to_string()),
            amount: Set(req.amount),
            currency: Set(req.currency.clone()),
            customer_id: Set(req.customer_id.clone()),
            payment_method_id: Set(req.payment_method_id.clone()),
            idempotency_key: Set(req.idempotency_key.clone()),
            retry_count: Set(0),
            metadata: Set(Some(req.metadata.clone())),
            error: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            completed_at: Set(None),
            failed_at: Set(None),
        };

        match active.insert(db).await {
            Ok(model) => Transaction::try_from(model),
            // A concurrent begin() with the same key won the race; the caller
            // re-reads by idempotency key rather than treating this as fatal.
            Err(DbErr::Query(e)) if e.to_string().contains("idempotency_key") => {
                Err(EngineError::conflict("idempotency_key_conflict", "transaction with this idempotency key already exists"))
            }
            Err(e) => Err(EngineError::from(e)),
        }
    }

    /// Applies a validated state transition plus whatever fields accompany it.
    /// Callers are expected to hold the per-transaction lock.
    pub async fn apply_transition(
        db: &DatabaseConnection,
        id: Uuid,
        new_status: TransactionStatus,
        error: Option<TransactionError>,
        metadata_patch: Option<serde_json::Value>,
        retry_count: Option<i32>,
    ) -> EngineResult<Transaction> {
        let model = Transactions::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| EngineError::not_found("transaction not found"))?;

        let current = TransactionStatus::parse(&model.status)?;
        if !current.can_transition_to(new_status) {
            return Err(EngineError::conflict(
                "state_conflict",
                format!("cannot transition from {} to {}", current.as_str(), new_status.as_str()),
            ));
        }

        let now = chrono::Utc::now().naive_utc();
        let mut active: transactions::ActiveModel = model.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(now);

        if let Some(count) = retry_count {
            active.retry_count = Set(count);
        }

        active.error = Set(error.map(|e| serde_json::to_value(e).unwrap_or(serde_json::json!({}))));

        if let Some(patch) = metadata_patch {
            active.metadata = Set(Some(patch));
        }

        match new_status {
            TransactionStatus::Completed => active.completed_at = Set(Some(now)),
            TransactionStatus::Failed | TransactionStatus::RolledBack => active.failed_at = Set(Some(now)),
            _ => {}
        }

        let updated = active.update(db).await?;
        Transaction::try_from(updated)
    }

    pub async fn count_by_status(db: &DatabaseConnection, status: TransactionStatus) -> EngineResult<u64> {
        let count = Transactions::find()
            .filter(transactions::Column::Status.eq(status.as_str()))
            .count(db)
            .await?;
        Ok(count)
    }

    pub async fn query(
        db: &DatabaseConnection,
        customer_id: &str,
        filters: &TransactionQueryFilters,
    ) -> EngineResult<Vec<Transaction>> {
        let mut query = Transactions::find().filter(transactions::Column::CustomerId.eq(customer_id));

        if let Some(status) = filters.status {
            query = query.filter(transactions::Column::Status.eq(status.as_str()));
        }
        if let Some(t) = filters.transaction_type {
            query = query.filter(transactions::Column::TransactionType.eq(t.as_str()));
        }
        if let Some(start) = filters.start_date {
            query = query.filter(transactions::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filters.end_date {
            query = query.filter(transactions::Column::CreatedAt.lte(end));
        }

        query = query.order_by_desc(transactions::Column::CreatedAt);

        if let Some(offset) = filters.offset {
            query = query.offset(offset);
        }
        query = query.limit(filters.limit.unwrap_or(50));

        let models = query.all(db).await?;
        models.into_iter().map(Transaction::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_allows_only_documented_edges() {
        use TransactionStatus::*;

        assert!(Pending.can_transition_to(Processing));
        assert!(Pending.can_transition_to(Failed));
        assert!(Processing.can_transition_to(Completed));
        assert!(Processing.can_transition_to(Failed));
        assert!(Processing.can_transition_to(RolledBack));
        assert!(Failed.can_transition_to(RecoveryPending));
        assert!(RecoveryPending.can_transition_to(RecoveryInProgress));
        assert!(RecoveryInProgress.can_transition_to(Completed));
        assert!(RecoveryInProgress.can_transition_to(Failed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(RecoveryInProgress));
        assert!(!RecoveryPending.can_transition_to(Completed));
    }

    #[test]
    fn terminal_statuses_have_no_outgoing_edges() {
        use TransactionStatus::*;
        for terminal in [Completed, RolledBack] {
            assert!(terminal.is_terminal());
            for candidate in [Pending, Processing, Completed, Failed, RolledBack, RecoveryPending, RecoveryInProgress] {
                assert!(!terminal.can_transition_to(candidate));
            }
        }
    }

    #[test]
    fn rejects_non_positive_amount() {
        assert!(Transaction::validate_amount_and_currency(rust_decimal::Decimal::ZERO, "USD").is_err());
        assert!(Transaction::validate_amount_and_currency(rust_decimal::Decimal::new(-100, 2), "USD").is_err());
    }

    #[test]
    fn rejects_malformed_currency() {
        let amount = rust_decimal::Decimal::new(1000, 2);
        assert!(Transaction::validate_amount_and_currency(amount, "usd").is_err());
        assert!(Transaction::validate_amount_and_currency(amount, "US").is_err());
        assert!(Transaction::validate_amount_and_currency(amount, "USD").is_ok());
    }

    #[test]
    fn rejects_short_idempotency_key() {
        assert!(Transaction::validate_idempotency_key("short").is_err());
        assert!(Transaction::validate_idempotency_key("idem-0001").is_ok());
    }

    #[test]
    fn same_request_ignores_idempotency_key_and_metadata() {
        let now = chrono::Utc::now().naive_utc();
        let tx = Transaction {
            id: Uuid::new_v4(),
            transaction_type: TransactionType::Payment,
            status: TransactionStatus::Pending,
            amount: rust_decimal::Decimal::new(10000, 2),
            currency: "USD".to_string(),
            customer_id: "C1".to_string(),
            payment_method_id: "PM1".to_string(),
            idempotency_key: "idem-0001".to_string(),
            retry_count: 0,
            metadata: serde_json::json!({}),
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
        };

        let matching = CreateTransactionRequest {
            transaction_type: TransactionType::Payment,
            amount: rust_decimal::Decimal::new(10000, 2),
            currency: "USD".to_string(),
            customer_id: "C1".to_string(),
            payment_method_id: "PM1".to_string(),
            idempotency_key: "idem-0001".to_string(),
            metadata: serde_json::json!({ "note": "irrelevant" }),
        };
        assert!(tx.same_request(&matching));

        let mut differing = matching.clone();
        differing.amount = rust_decimal::Decimal::new(20000, 2);
        assert!(!tx.same_request(&differing));
    }
}
