//! Ledger domain (accounts, transaction log records, transfer rule).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod account;
pub mod transaction;
pub mod transfer;
pub mod user;

pub use account::{Account, BANK_ISSUER_NAME};
pub use transaction::{Transaction, TransactionStatus};
pub use transfer::{Decision, Posting, Rejection, TransferRequest, decide};
pub use user::User;
