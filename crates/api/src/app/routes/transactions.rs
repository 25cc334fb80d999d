use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use bankledger_core::TransactionId;

use crate::app::{dto, errors, extract::ApiJson, routes::parse_id, services::AppServices};

pub async fn create_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::CreateTransactionRequest>,
) -> axum::response::Response {
    match services.engine.transfer(body.into()).await {
        Ok(record) => (
            StatusCode::CREATED,
            Json(json!({
                "status": "created",
                "transactionId": record.id.to_string(),
                "data": dto::TransactionResponse::from(record),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_transactions(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.engine.list_transactions().await {
        Ok(items) => Json(dto::list::<_, dto::TransactionResponse>(items)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_transaction(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id::<TransactionId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.engine.get_transaction(id).await {
        Ok(record) => Json(dto::data(dto::TransactionResponse::from(record))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
