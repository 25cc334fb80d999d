use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;

use crate::app::{dto, errors, extract::ApiJson, services::AppServices};
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Trade the issuer secret for a bank-issuer token.
pub async fn exchange_issuer_key(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<dto::IssuerKeyRequest>,
) -> axum::response::Response {
    match services.issuer_gate.exchange(&body.token, Utc::now()) {
        Ok(token) => (StatusCode::CREATED, Json(json!({ "token": token }))).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn check_token(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(json!({
        "auth": "success",
        "principal": principal.principal_id().to_string(),
        "role": principal.role().as_str(),
    }))
}
