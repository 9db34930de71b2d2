use crate::fixtures::TransactionFixture;
use ledger_engine::errors::TransactionError;
use ledger_engine::models::{Transaction, TransactionStatus};
use sea_orm::{DatabaseBackend, MockDatabase};

#[tokio::test]
async fn apply_transition_rejects_edges_outside_the_graph() {
    let completed = TransactionFixture::with_status("COMPLETED");
    let id = completed.id;

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results(vec![vec![completed]]).into_connection();

    let result = Transaction::apply_transition(&db, id, TransactionStatus::Processing, None, None, None).await;

    let err = result.expect_err("COMPLETED -> PROCESSING is not in the state graph");
    assert!(matches!(err, ledger_engine::errors::EngineError::Conflict { .. }));
}

#[tokio::test]
async fn apply_transition_follows_a_valid_edge() {
    let pending = TransactionFixture::pending();
    let id = pending.id;
    let mut processing = pending.clone();
    processing.status = "PROCESSING".to_string();

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results(vec![vec![pending], vec![processing]]).into_connection();

    let updated = Transaction::apply_transition(&db, id, TransactionStatus::Processing, None, None, None)
        .await
        .expect("PENDING -> PROCESSING is a valid edge");

    assert_eq!(updated.status, TransactionStatus::Processing);
}

#[tokio::test]
async fn apply_transition_records_the_failure_error_and_failed_at() {
    let processing = TransactionFixture::with_status("PROCESSING");
    let id = processing.id;
    let mut failed = processing.clone();
    failed.status = "FAILED".to_string();
    failed.failed_at = Some(chrono::Utc::now().naive_utc());
    let error = TransactionError::new("NETWORK_ERROR", "provider unreachable", true, true);
    failed.error = Some(serde_json::to_value(&error).unwrap());

    let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results(vec![vec![processing], vec![failed]]).into_connection();

    let updated = Transaction::apply_transition(&db, id, TransactionStatus::Failed, Some(error.clone()), None, None)
        .await
        .expect("PROCESSING -> FAILED is a valid edge");

    assert_eq!(updated.status, TransactionStatus::Failed);
    assert_eq!(updated.error, Some(error));
    assert!(updated.failed_at.is_some());
}
