use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::app::{dto, errors, extract::ApiJson, services::AppServices};

pub async fn create_account(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::CreateAccountRequest>,
) -> axum::response::Response {
    match services.engine.create_account(&body.name, body.opening_balance).await {
        Ok(account) => (
            StatusCode::CREATED,
            Json(json!({
                "id": account.id.to_string(),
                "data": dto::AccountResponse::from(account),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_accounts(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.engine.list_accounts().await {
        Ok(items) => Json(dto::list::<_, dto::AccountResponse>(items)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// `:id` may be an account id or an account name.
pub async fn get_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    match services.engine.find_account(&key).await {
        Ok(account) => Json(dto::data(dto::AccountResponse::from(account))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_account_transactions(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    let account = match services.engine.find_account(&key).await {
        Ok(account) => account,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match services.engine.list_transactions_for(&account.name).await {
        Ok(items) => Json(dto::list::<_, dto::TransactionResponse>(items)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path(key): Path<String>,
) -> axum::response::Response {
    let account = match services.engine.find_account(&key).await {
        Ok(account) => account,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match services.engine.delete_account(account.id).await {
        Ok(()) => Json(json!({ "message": "account deleted" })).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
