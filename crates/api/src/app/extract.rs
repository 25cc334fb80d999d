//! Request extractors that answer in the API's error shape.

use axum::{
    Json,
    extract::{FromRequest, Request},
    response::Response,
};
use serde::de::DeserializeOwned;

use bankledger_core::LedgerError;

use crate::app::errors;

/// `Json<T>` whose rejections become `400 invalid_argument` instead of
/// axum's plain-text 4xx bodies.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(errors::ledger_error_to_response(
                LedgerError::invalid_argument(rejection.body_text()),
            )),
        }
    }
}
