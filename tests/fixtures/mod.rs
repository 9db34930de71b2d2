use ledger_engine::models::_entities::transactions;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

pub struct TransactionFixture;

impl TransactionFixture {
    pub fn pending() -> transactions::Model {
        Self::with_status("PENDING")
    }

    pub fn with_status(status: &str) -> transactions::Model {
        let now = chrono::Utc::now().naive_utc();
        transactions::Model {
            id: Uuid::new_v4(),
            transaction_type: "PAYMENT".to_string(),
            status: status.to_string(),
            amount: Decimal::from_str("100.00").unwrap(),
            currency: "USD".to_string(),
            customer_id: "C1".to_string(),
            payment_method_id: "PM1".to_string(),
            idempotency_key: "idem-fixture-0001".to_string(),
            retry_count: 0,
            metadata: Some(serde_json::json!({})),
            error: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
        }
    }
}
