use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankledger_core::TransactionId;

use crate::transfer::{Rejection, TransferRequest};

/// Lifecycle state of a transfer attempt.
///
/// `Pending` exists only in memory while a transfer is in flight; the log
/// only ever stores `Committed` or `Failed`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Committed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "Pending",
            TransactionStatus::Committed => "Committed",
            TransactionStatus::Failed => "Failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Pending" => Some(TransactionStatus::Pending),
            "Committed" => Some(TransactionStatus::Committed),
            "Failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

/// Immutable transaction log record.
///
/// `sender`/`receiver` reference accounts by name. `reason` is set only on
/// `Failed` records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: i64,
    pub memo: String,
    pub timestamp: DateTime<Utc>,
    pub status: TransactionStatus,
    pub sender: String,
    pub receiver: String,
    pub reason: Option<String>,
}

impl Transaction {
    /// Start a new attempt for an already-validated request.
    pub fn pending(request: &TransferRequest, accepted_at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new(),
            amount: request.amount,
            memo: request.memo.clone(),
            timestamp: accepted_at,
            status: TransactionStatus::Pending,
            sender: request.sender.clone(),
            receiver: request.receiver.clone(),
            reason: None,
        }
    }

    pub fn commit(mut self) -> Self {
        self.status = TransactionStatus::Committed;
        self.reason = None;
        self
    }

    pub fn fail(mut self, rejection: Rejection) -> Self {
        self.status = TransactionStatus::Failed;
        self.reason = Some(rejection.reason().to_string());
        self
    }

    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }

    /// Whether this record names `account` on either side.
    pub fn involves(&self, account: &str) -> bool {
        self.sender == account || self.receiver == account
    }
}
