use serde::{Deserialize, Serialize};
use serde_json::json;

use bankledger_core::AccountId;
use bankledger_ledger::{Account, Transaction, TransferRequest, User};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct IssuerKeyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub receiver: String,
    pub amount: i64,
    #[serde(default)]
    pub memo: String,
}

impl From<CreateTransactionRequest> for TransferRequest {
    fn from(value: CreateTransactionRequest) -> Self {
        TransferRequest {
            sender: value.sender,
            receiver: value.receiver,
            amount: value.amount,
            memo: value.memo,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub opening_balance: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkAccountsRequest {
    pub accounts: Vec<AccountId>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: String,
    pub amount: i64,
    pub memo: String,
    pub timestamp: String,
    pub status: &'static str,
    pub sender: String,
    pub receiver: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Transaction> for TransactionResponse {
    fn from(t: Transaction) -> Self {
        Self {
            id: t.id.to_string(),
            amount: t.amount,
            memo: t.memo,
            timestamp: t.timestamp.to_rfc3339(),
            status: t.status.as_str(),
            sender: t.sender,
            receiver: t.receiver,
            reason: t.reason,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub balance: i64,
    pub created_at: String,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            id: a.id.to_string(),
            name: a.name,
            balance: a.balance,
            created_at: a.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub accounts: Vec<String>,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.to_string(),
            name: u.name,
            accounts: u.accounts.iter().map(ToString::to_string).collect(),
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// `{"data": ...}` envelope used by single-item reads.
pub fn data<T: Serialize>(item: T) -> serde_json::Value {
    json!({ "data": item })
}

pub fn list<T, U>(items: Vec<T>) -> Vec<U>
where
    U: From<T>,
{
    items.into_iter().map(U::from).collect()
}
