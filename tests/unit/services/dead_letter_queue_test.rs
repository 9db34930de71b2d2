use ledger_engine::errors::TransactionError;
use ledger_engine::models::DeadLetterEntry;
use ledger_engine::models::_entities::dead_letter;
use ledger_engine::services::dead_letter_queue::DeadLetterQueue;
use sea_orm::{DatabaseBackend, MockDatabase};
use uuid::Uuid;

fn entry(code: &str) -> dead_letter::Model {
    let error = TransactionError::new(code, "exhausted", true, false);
    dead_letter::Model {
        transaction_id: Uuid::new_v4(),
        error: serde_json::to_value(&error).unwrap(),
        enqueued_at: chrono::Utc::now().naive_utc(),
    }
}

#[tokio::test]
async fn stats_by_code_groups_entries() {
    let rows = vec![entry("RETRY_LIMIT_EXCEEDED"), entry("RETRY_LIMIT_EXCEEDED"), entry("MANUAL_REVIEW_REQUIRED")];

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results(vec![rows]).into_connection();

    let stats = DeadLetterQueue::stats_by_code(&db).await.unwrap();

    assert_eq!(stats.get("RETRY_LIMIT_EXCEEDED"), Some(&2));
    assert_eq!(stats.get("MANUAL_REVIEW_REQUIRED"), Some(&1));
}

#[tokio::test]
async fn list_parses_persisted_entries() {
    let model = entry("RETRY_LIMIT_EXCEEDED");
    let transaction_id = model.transaction_id;

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results(vec![vec![model]]).into_connection();

    let entries: Vec<DeadLetterEntry> = DeadLetterEntry::list(&db, 50, 0).await.unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].transaction_id, transaction_id);
    assert_eq!(entries[0].error.code, "RETRY_LIMIT_EXCEEDED");
}
