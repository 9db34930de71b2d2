use axum::extract::Path;
use axum::http::HeaderMap;
use loco_rs::prelude::*;
use serde::Deserialize;
use tracing::{info, warn};

use crate::app::engine;
use crate::errors::{EngineError, EngineResult, TransactionError};
use crate::models::TransactionStatus;
use crate::services::webhook_verifier;

/// Minimal shape every provider's settlement webhook is expected to carry.
/// Provider-specific fields beyond these are ignored.
#[derive(Debug, Deserialize)]
struct WebhookPayload {
    transaction_id: uuid::Uuid,
    status: String,
    #[serde(default)]
    provider_reference: Option<String>,
}

pub fn routes() -> Routes {
    Routes::new().prefix("webhooks").add("/:provider", post(receive))
}

async fn receive(Path(provider): Path<String>, headers: HeaderMap, body: axum::body::Bytes) -> EngineResult<Json<serde_json::Value>> {
    let signature = headers
        .get("x-webhook-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| EngineError::Unauthorized { message: "missing webhook signature".to_string() })?;

    webhook_verifier::verify(&provider, &body, signature)?;

    let payload: WebhookPayload =
        serde_json::from_slice(&body).map_err(|e| EngineError::validation(format!("malformed webhook body: {e}")))?;

    info!(provider = %provider, transaction_id = %payload.transaction_id, status = %payload.status, "webhook received");

    let new_status = match payload.status.to_lowercase().as_str() {
        "completed" | "settled" => TransactionStatus::Completed,
        "failed" | "declined" => TransactionStatus::Failed,
        other => {
            warn!(provider = %provider, status = other, "unrecognized webhook status, ignoring");
            return Ok(Json(serde_json::json!({ "acknowledged": true })));
        }
    };

    let metadata = payload.provider_reference.map(|reference| serde_json::json!({ "providerReference": reference }));

    if new_status == TransactionStatus::Failed {
        let tx = engine().transaction_manager.get(payload.transaction_id).await?;
        let error = tx.error.unwrap_or_else(|| TransactionError::new("PROVIDER_WEBHOOK_DECLINE", "provider webhook reported a decline", true, true));
        engine().transaction_manager.handle_webhook_failure(payload.transaction_id, error).await?;
    } else {
        engine().transaction_manager.update_status(payload.transaction_id, new_status, metadata).await?;
    }

    Ok(Json(serde_json::json!({ "acknowledged": true })))
}
