use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use bankledger_auth::AuthError;
use bankledger_core::LedgerError;

pub fn ledger_error_status(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        LedgerError::NotFound(_) | LedgerError::AccountNotFound { .. } => StatusCode::NOT_FOUND,
        LedgerError::AlreadyExists(_) | LedgerError::HasReferences(_) => StatusCode::CONFLICT,
        LedgerError::InsufficientFunds { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::Unauthorized => StatusCode::UNAUTHORIZED,
        LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::Timeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// `{"error", "message"}`, plus `status`/`transactionId` when the rejection
/// was written to the log as a `Failed` record.
pub fn ledger_error_to_response(err: LedgerError) -> axum::response::Response {
    let status = ledger_error_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }

    let mut body = json!({
        "error": err.code(),
        "message": err.to_string(),
    });
    if let Some(id) = err.failed_transaction() {
        body["status"] = json!("failed");
        body["transactionId"] = json!(id.to_string());
    }

    (status, axum::Json(body)).into_response()
}

pub fn auth_error_to_response(err: AuthError) -> axum::response::Response {
    tracing::debug!(error = %err, "request not authorized");
    let message = match err {
        AuthError::InvalidIssuerSecret => "invalid key provided".to_string(),
        other => other.to_string(),
    };
    json_error(StatusCode::UNAUTHORIZED, LedgerError::Unauthorized.code(), message)
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankledger_core::{Party, TransactionId};

    #[test]
    fn every_error_maps_to_its_status() {
        let id = TransactionId::new();
        let cases = [
            (LedgerError::invalid_argument("x"), StatusCode::BAD_REQUEST),
            (LedgerError::not_found("x"), StatusCode::NOT_FOUND),
            (
                LedgerError::AccountNotFound {
                    party: Party::Sender,
                    transaction_id: id,
                },
                StatusCode::NOT_FOUND,
            ),
            (LedgerError::already_exists("x"), StatusCode::CONFLICT),
            (LedgerError::InsufficientFunds { transaction_id: id }, StatusCode::UNPROCESSABLE_ENTITY),
            (LedgerError::has_references("x"), StatusCode::CONFLICT),
            (LedgerError::Unauthorized, StatusCode::UNAUTHORIZED),
            (LedgerError::store("x"), StatusCode::SERVICE_UNAVAILABLE),
            (LedgerError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(ledger_error_status(&err), status, "{err:?}");
        }
    }
}
