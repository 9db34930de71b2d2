use axum::extract::{Path, Query};
use loco_rs::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::engine;
use crate::errors::EngineResult;
use crate::models::{DeadLetterEntry, Transaction};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct DeadLetterStatsResponse {
    pub by_code: std::collections::HashMap<String, u64>,
}

pub fn routes() -> Routes {
    Routes::new()
        .prefix("dead-letter")
        .add("/", get(list))
        .add("/stats", get(stats))
        .add("/:id/reprocess", post(reprocess))
}

async fn list(Query(query): Query<ListQuery>) -> EngineResult<Json<Vec<DeadLetterEntry>>> {
    let db = engine().transaction_manager.db_handle();
    let entries = DeadLetterEntry::list(&db, query.limit.unwrap_or(50), query.offset.unwrap_or(0)).await?;
    Ok(Json(entries))
}

async fn stats() -> EngineResult<Json<DeadLetterStatsResponse>> {
    let by_code = engine().recovery_manager.get_dead_letter_queue_stats().await?;
    Ok(Json(DeadLetterStatsResponse { by_code }))
}

async fn reprocess(Path(id): Path<Uuid>) -> EngineResult<Json<Transaction>> {
    let tx = engine().recovery_manager.reprocess_from_dead_letter(id).await?;
    Ok(Json(tx))
}
