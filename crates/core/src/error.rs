//! Ledger error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::TransactionId;

/// Result type used across the ledger layers.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Which side of a transfer an error refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Sender,
    Receiver,
}

impl Party {
    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Sender => "sender",
            Party::Receiver => "receiver",
        }
    }
}

impl core::fmt::Display for Party {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ledger-level error.
///
/// Every variant is terminal for the request that produced it and never leaves
/// a partial side effect behind. Rejections that were written to the
/// transaction log carry the id of the `Failed` record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed or missing request fields.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An account, transaction or user was not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A transfer named an account that does not exist.
    #[error("{party} account not found")]
    AccountNotFound {
        party: Party,
        transaction_id: TransactionId,
    },

    /// Duplicate account/user name.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The debited account cannot cover the transfer.
    #[error("insufficient funds")]
    InsufficientFunds { transaction_id: TransactionId },

    /// Delete blocked by a remaining linkage.
    #[error("has references: {0}")]
    HasReferences(String),

    /// Missing, invalid or role-mismatched credential.
    #[error("unauthorized")]
    Unauthorized,

    /// Underlying persistence failure (fatal to the request only).
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The request-scoped deadline elapsed before the transfer completed.
    #[error("transfer timed out")]
    Timeout,
}

impl LedgerError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    pub fn has_references(msg: impl Into<String>) -> Self {
        Self::HasReferences(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Id of the `Failed` record written for this rejection, if any.
    pub fn failed_transaction(&self) -> Option<TransactionId> {
        match self {
            Self::AccountNotFound { transaction_id, .. } => Some(*transaction_id),
            Self::InsufficientFunds { transaction_id } => Some(*transaction_id),
            _ => None,
        }
    }

    /// Stable machine-readable code for transport layers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::NotFound(_) => "not_found",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::AlreadyExists(_) => "already_exists",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::HasReferences(_) => "has_references",
            Self::Unauthorized => "unauthorized",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Timeout => "timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_expose_their_failed_record() {
        let id = TransactionId::new();
        let err = LedgerError::AccountNotFound {
            party: Party::Receiver,
            transaction_id: id,
        };
        assert_eq!(err.failed_transaction(), Some(id));
        assert_eq!(err.to_string(), "receiver account not found");

        let err = LedgerError::InsufficientFunds { transaction_id: id };
        assert_eq!(err.failed_transaction(), Some(id));
        assert_eq!(err.code(), "insufficient_funds");
    }

    #[test]
    fn validation_errors_have_no_record() {
        let err = LedgerError::invalid_argument("memo must not be empty");
        assert_eq!(err.failed_transaction(), None);
        assert_eq!(err.to_string(), "invalid argument: memo must not be empty");
    }
}
