use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use bankledger_core::{AccountId, LedgerError, TransactionId, UserId};
use bankledger_ledger::{Account, Transaction, User};

/// Storage-level error.
///
/// These are **infrastructure errors**. Every variant surfaces to ledger
/// callers as `LedgerError::StoreUnavailable`; none of them leave a partial
/// write behind.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    #[error("corrupt row in {table}: {message}")]
    Corrupt { table: &'static str, message: String },

    #[error("account '{0}' vanished during transaction")]
    Vanished(String),

    #[error("balance overflow on account '{0}'")]
    Overflow(String),

    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        LedgerError::StoreUnavailable(value.to_string())
    }
}

/// Outcome of a conditional delete.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    NotFound,
    /// Blocked by a remaining reference (user → account link).
    Referenced,
}

/// Outcome of inserting a user together with its first account link.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UserInsert {
    Inserted,
    Duplicate,
    AccountNotFound(AccountId),
}

/// Outcome of changing a user's account links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkUpdate {
    Updated(User),
    UserNotFound,
    AccountNotFound(AccountId),
}

/// A unit of work over balances and the transaction log.
///
/// Nothing is visible to other readers until [`LedgerTx::commit`] returns
/// `Ok`. Dropping the handle without committing discards every staged write.
#[async_trait]
pub trait LedgerTx: Send {
    /// Current balance of `name`, locking the row for the rest of the unit.
    /// `None` if the account does not exist.
    async fn balance_for_update(&mut self, name: &str) -> Result<Option<i64>, StoreError>;

    /// Stage a balance change. Only the transfer engine calls this.
    async fn adjust_balance(&mut self, name: &str, delta: i64) -> Result<(), StoreError>;

    /// Stage a log append.
    async fn append_transaction(&mut self, record: &Transaction) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Durable accounts, transaction log and users.
///
/// ## Atomicity
///
/// - name uniqueness is enforced by a single insert-if-absent step
/// - conditional deletes check references and delete in one step
/// - balance mutations only happen through a [`LedgerTx`]
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Insert `account` unless its name is taken. Returns `false` on duplicate.
    async fn insert_account_if_absent(&self, account: &Account) -> Result<bool, StoreError>;

    async fn account_by_name(&self, name: &str) -> Result<Option<Account>, StoreError>;

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError>;

    /// Delete unless some user still links the account.
    async fn delete_account_unless_linked(&self, id: AccountId) -> Result<Removal, StoreError>;

    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, StoreError>;

    async fn transaction_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Full log in append order.
    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError>;

    /// Log records naming `account` as sender or receiver, in append order.
    async fn transactions_involving(&self, account: &str) -> Result<Vec<Transaction>, StoreError>;

    /// Insert `user` (with its initial links) unless its name is taken.
    async fn insert_user_if_absent(&self, user: &User) -> Result<UserInsert, StoreError>;

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    /// Users whose links include `account`.
    async fn users_linking(&self, account: AccountId) -> Result<Vec<User>, StoreError>;

    /// Append links (duplicates ignored); every account must exist.
    async fn link_accounts(&self, user: UserId, accounts: &[AccountId]) -> Result<LinkUpdate, StoreError>;

    async fn unlink_account(&self, user: UserId, account: AccountId) -> Result<LinkUpdate, StoreError>;

    /// Delete unless the user still links any account.
    async fn delete_user_unless_linked(&self, id: UserId) -> Result<Removal, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn insert_account_if_absent(&self, account: &Account) -> Result<bool, StoreError> {
        (**self).insert_account_if_absent(account).await
    }

    async fn account_by_name(&self, name: &str) -> Result<Option<Account>, StoreError> {
        (**self).account_by_name(name).await
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).account_by_id(id).await
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        (**self).list_accounts().await
    }

    async fn delete_account_unless_linked(&self, id: AccountId) -> Result<Removal, StoreError> {
        (**self).delete_account_unless_linked(id).await
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, StoreError> {
        (**self).begin().await
    }

    async fn transaction_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        (**self).transaction_by_id(id).await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        (**self).list_transactions().await
    }

    async fn transactions_involving(&self, account: &str) -> Result<Vec<Transaction>, StoreError> {
        (**self).transactions_involving(account).await
    }

    async fn insert_user_if_absent(&self, user: &User) -> Result<UserInsert, StoreError> {
        (**self).insert_user_if_absent(user).await
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).user_by_id(id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        (**self).list_users().await
    }

    async fn users_linking(&self, account: AccountId) -> Result<Vec<User>, StoreError> {
        (**self).users_linking(account).await
    }

    async fn link_accounts(&self, user: UserId, accounts: &[AccountId]) -> Result<LinkUpdate, StoreError> {
        (**self).link_accounts(user, accounts).await
    }

    async fn unlink_account(&self, user: UserId, account: AccountId) -> Result<LinkUpdate, StoreError> {
        (**self).unlink_account(user, account).await
    }

    async fn delete_user_unless_linked(&self, id: UserId) -> Result<Removal, StoreError> {
        (**self).delete_user_unless_linked(id).await
    }
}
