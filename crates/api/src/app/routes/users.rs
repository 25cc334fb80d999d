use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use bankledger_core::UserId;

use crate::app::{dto, errors, extract::ApiJson, routes::parse_id, services::AppServices};

/// `:account` may be an account id or an account name.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(account): Path<String>,
    ApiJson(body): ApiJson<dto::CreateUserRequest>,
) -> axum::response::Response {
    let account = match services.engine.find_account(&account).await {
        Ok(account) => account,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match services.engine.create_user(&body.name, account.id).await {
        Ok(user) => (
            StatusCode::CREATED,
            Json(json!({
                "id": user.id.to_string(),
                "data": dto::UserResponse::from(user),
            })),
        )
            .into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.engine.list_users().await {
        Ok(items) => Json(dto::list::<_, dto::UserResponse>(items)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.engine.get_user(id).await {
        Ok(user) => Json(dto::data(dto::UserResponse::from(user))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Append account links; already-linked accounts are ignored.
pub async fn link_accounts(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<dto::LinkAccountsRequest>,
) -> axum::response::Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.engine.link_accounts(id, &body.accounts).await {
        Ok(user) => Json(dto::data(dto::UserResponse::from(user))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn unlink_account(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, account)): Path<(String, String)>,
) -> axum::response::Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let account = match services.engine.find_account(&account).await {
        Ok(account) => account,
        Err(e) => return errors::ledger_error_to_response(e),
    };

    match services.engine.unlink_account(id, account.id).await {
        Ok(user) => Json(dto::data(dto::UserResponse::from(user))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id = match parse_id::<UserId>(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.engine.delete_user(id).await {
        Ok(()) => Json(json!({ "message": "user deleted" })).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
