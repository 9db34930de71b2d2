use axum::extract::{Path, Query};
use loco_rs::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::app::engine;
use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::{CreateTransactionRequest, Transaction, TransactionQueryFilters, TransactionStatus, TransactionType};

#[derive(Debug, Deserialize)]
pub struct CreateTransactionPayload {
    #[serde(rename = "type")]
    pub transaction_type: String,
    pub amount: Decimal,
    pub currency: String,
    pub customer_id: String,
    pub payment_method_id: String,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct TransactionListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub start_date: Option<chrono::NaiveDateTime>,
    pub end_date: Option<chrono::NaiveDateTime>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusPayload {
    pub status: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct RetryStatsResponse {
    pub stats: std::collections::HashMap<String, u64>,
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("transactions")
        .add("/", post(create_transaction))
        .add("/:id", get(get_transaction))
        .add("/:id/status", put(update_status))
        .add("/:id/retry", post(retry_transaction))
        .add("/:id/retry", delete(cancel_retry))
        .add("/customer/:customer_id", get(list_by_customer))
        .add("/stats/retry", get(retry_stats))
}

async fn create_transaction(Json(payload): Json<CreateTransactionPayload>) -> EngineResult<Json<Transaction>> {
    let transaction_type = TransactionType::parse(&payload.transaction_type.to_uppercase())?;

    let req = CreateTransactionRequest {
        transaction_type,
        amount: payload.amount,
        currency: payload.currency,
        customer_id: payload.customer_id,
        payment_method_id: payload.payment_method_id,
        idempotency_key: payload.idempotency_key,
        metadata: payload.metadata,
    };

    info!(customer_id = %req.customer_id, amount = %req.amount, "beginning transaction");
    let tx = engine().transaction_manager.begin(req).await?;
    Ok(Json(tx))
}

async fn get_transaction(Path(id): Path<Uuid>) -> EngineResult<Json<Transaction>> {
    let tx = engine().transaction_manager.get(id).await?;
    Ok(Json(tx))
}

async fn list_by_customer(Path(customer_id): Path<String>, Query(query): Query<TransactionListQuery>) -> EngineResult<Json<Vec<Transaction>>> {
    let filters = TransactionQueryFilters {
        status: query.status.map(|s| TransactionStatus::parse(&s.to_uppercase())).transpose()?,
        transaction_type: query.transaction_type.map(|t| TransactionType::parse(&t.to_uppercase())).transpose()?,
        start_date: query.start_date,
        end_date: query.end_date,
        limit: query.limit,
        offset: query.offset,
    };

    let transactions = engine().transaction_manager.query(&customer_id, &filters).await?;
    Ok(Json(transactions))
}

async fn update_status(Path(id): Path<Uuid>, Json(payload): Json<UpdateStatusPayload>) -> EngineResult<Json<Transaction>> {
    let status = TransactionStatus::parse(&payload.status.to_uppercase())?;
    let tx = engine().transaction_manager.update_status(id, status, payload.metadata).await?;
    Ok(Json(tx))
}

/// Rejects with `400 invalid_transaction_state` unless the transaction is
/// currently FAILED.
async fn retry_transaction(Path(id): Path<Uuid>) -> EngineResult<Json<Transaction>> {
    let tx = engine().transaction_manager.get(id).await?;
    if tx.status != TransactionStatus::Failed {
        return Err(EngineError::validation_with_code("invalid_transaction_state", "transaction is not retryable: status must be FAILED"));
    }

    let error = tx.error.clone().unwrap_or_else(TransactionError::manual_retry);
    let updated = engine().retry_manager.schedule_retry(&tx_db(), &tx, &error).await?;
    Ok(Json(updated))
}

async fn cancel_retry(Path(id): Path<Uuid>) -> EngineResult<Json<serde_json::Value>> {
    let cancelled = engine().retry_manager.cancel_retry(&tx_db(), id).await?;
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}

async fn retry_stats() -> EngineResult<Json<RetryStatsResponse>> {
    let stats = engine().retry_manager.get_retry_stats(&tx_db()).await?;
    Ok(Json(RetryStatsResponse { stats }))
}

/// Services hold their own connection handle; controllers only need the
/// handle for calls that require it explicitly rather than through
/// `TransactionManager`.
fn tx_db() -> sea_orm::DatabaseConnection {
    engine().transaction_manager.db_handle()
}
