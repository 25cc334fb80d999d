use std::str::FromStr;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use bankledger_core::LedgerError;

use crate::app::errors;

pub mod accounts;
pub mod system;
pub mod transactions;
pub mod users;

/// Endpoints reachable without a token.
pub fn public_router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/auth/call", post(system::exchange_issuer_key))
        .route("/api/user", get(users::list_users))
        .route("/api/user/:id", get(users::get_user))
}

/// Endpoints requiring a bank-issuer token.
pub fn protected_router() -> Router {
    Router::new()
        .route("/auth/call", get(system::check_token))
        .route("/api/transactions/create", post(transactions::create_transaction))
        .route("/api/transactions", get(transactions::list_transactions))
        .route("/api/transactions/:id", get(transactions::get_transaction))
        .route("/api/account/create", post(accounts::create_account))
        .route("/api/account", get(accounts::list_accounts))
        .route(
            "/api/account/:id",
            get(accounts::get_account).delete(accounts::delete_account),
        )
        .route("/api/account/:id/transactions", get(accounts::list_account_transactions))
        .route("/api/user/create/:account", post(users::create_user))
        .route("/api/user/:id", put(users::link_accounts).delete(users::delete_user))
        .route("/api/user/:id/accounts/:account", delete(users::unlink_account))
}

/// Parse a path segment into a typed id, answering 400 on failure.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = LedgerError>,
{
    raw.parse::<T>().map_err(errors::ledger_error_to_response)
}
