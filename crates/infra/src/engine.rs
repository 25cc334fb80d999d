//! Ledger engine: the only writer of account balances.
//!
//! ## Transfer lifecycle
//!
//! 1. Argument validation. Failures here are returned without touching the log.
//! 2. A `Pending` record is stamped at acceptance.
//! 3. Under the per-account locks (sorted order) a store transaction reads both
//!    balances, applies the decision rule and either
//!    - applies both balance deltas and appends the `Committed` record, or
//!    - appends a `Failed` record with its reason.
//! 4. The store transaction commits. Nothing is visible before this step.
//!
//! Step 3 runs under a deadline. When it elapses the in-flight store
//! transaction is dropped (rolled back) and the caller sees `Timeout`. A
//! commit, once started, runs to completion and is never reported as a
//! timeout.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use bankledger_core::{
    AccountId, LedgerError, LedgerResult, Party, TransactionId, UserId,
};
use bankledger_ledger::{
    Account, Decision, Rejection, Transaction, TransferRequest, User, decide,
};

use crate::bootstrap::{BankIssuer, ensure_bank_issuer};
use crate::locks::{AccountLocks, HeldLocks};
use crate::store::{LedgerStore, LedgerTx, LinkUpdate, Removal, UserInsert};

pub struct LedgerEngine<S> {
    store: S,
    locks: AccountLocks,
    deadline: Duration,
    issuer: BankIssuer,
}

impl<S> LedgerEngine<S>
where
    S: LedgerStore,
{
    pub fn new(store: S, issuer: BankIssuer, deadline: Duration) -> Self {
        Self {
            store,
            locks: AccountLocks::new(),
            deadline,
            issuer,
        }
    }

    /// Ensure the bank-issuer account exists, then build the engine around it.
    pub async fn bootstrap(store: S, deadline: Duration) -> LedgerResult<Self> {
        let issuer = ensure_bank_issuer(&store).await?;
        Ok(Self::new(store, issuer, deadline))
    }

    pub fn issuer(&self) -> &BankIssuer {
        &self.issuer
    }

    // ─────────────────────────────────────────────────────────────────────
    // Transfers
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(
        skip(self, request),
        fields(sender = %request.sender, receiver = %request.receiver, amount = request.amount),
        err
    )]
    pub async fn transfer(&self, mut request: TransferRequest) -> LedgerResult<Transaction> {
        request.normalize();
        request.validate()?;
        let pending = Transaction::pending(&request, Utc::now());
        let transaction_id = pending.id;

        let settled = match tokio::time::timeout(self.deadline, self.settle(&request, pending)).await {
            Ok(settled) => settled?,
            Err(_) => {
                warn!(%transaction_id, deadline = ?self.deadline, "transfer timed out");
                return Err(LedgerError::Timeout);
            }
        };

        let Settled {
            tx,
            _held,
            record,
            decision,
        } = settled;
        tx.commit().await?;

        match decision {
            Decision::Apply(posting) => {
                info!(
                    transaction_id = %record.id,
                    debit = %posting.debit,
                    credit = %posting.credit,
                    magnitude = posting.magnitude,
                    "transfer committed"
                );
                Ok(record)
            }
            Decision::Reject(rejection) => {
                warn!(
                    transaction_id = %record.id,
                    reason = rejection.reason(),
                    "transfer rejected"
                );
                Err(rejection_error(rejection, record.id))
            }
        }
    }

    /// Lock, read, decide and stage the writes. Everything short of the commit.
    async fn settle(&self, request: &TransferRequest, pending: Transaction) -> LedgerResult<Settled<'_>> {
        let held = self
            .locks
            .acquire(&[request.sender.as_str(), request.receiver.as_str()])
            .await?;
        let mut tx = self.store.begin().await?;

        // Row locks follow the same order as the in-process locks.
        let (low, high) = if request.sender <= request.receiver {
            (request.sender.as_str(), request.receiver.as_str())
        } else {
            (request.receiver.as_str(), request.sender.as_str())
        };
        let low_balance = tx.balance_for_update(low).await?;
        let high_balance = if low == high {
            low_balance
        } else {
            tx.balance_for_update(high).await?
        };
        let balance_of = |name: &str| if name == low { low_balance } else { high_balance };

        let decision = decide(request, balance_of(&request.sender), balance_of(&request.receiver));
        let record = match &decision {
            Decision::Apply(posting) => {
                for (name, delta) in posting.deltas() {
                    tx.adjust_balance(name, delta).await?;
                }
                pending.commit()
            }
            Decision::Reject(rejection) => pending.fail(*rejection),
        };
        tx.append_transaction(&record).await?;

        Ok(Settled {
            tx,
            _held: held,
            record,
            decision,
        })
    }

    pub async fn get_transaction(&self, id: TransactionId) -> LedgerResult<Transaction> {
        self.store
            .transaction_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("transaction {id}")))
    }

    pub async fn list_transactions(&self) -> LedgerResult<Vec<Transaction>> {
        Ok(self.store.list_transactions().await?)
    }

    /// Log records where `account` is sender or receiver.
    pub async fn list_transactions_for(&self, account: &str) -> LedgerResult<Vec<Transaction>> {
        let account = self.get_account(account).await?;
        Ok(self.store.transactions_involving(&account.name).await?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accounts
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self), err)]
    pub async fn create_account(&self, name: &str, opening_balance: i64) -> LedgerResult<Account> {
        let account = Account::open(name, opening_balance, Utc::now())?;
        if !self.store.insert_account_if_absent(&account).await? {
            return Err(LedgerError::already_exists(format!("account '{}'", account.name)));
        }
        info!(account_id = %account.id, name = %account.name, "account created");
        Ok(account)
    }

    pub async fn get_account(&self, name: &str) -> LedgerResult<Account> {
        self.store
            .account_by_name(name)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("account '{name}'")))
    }

    pub async fn get_account_by_id(&self, id: AccountId) -> LedgerResult<Account> {
        self.store
            .account_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("account {id}")))
    }

    /// Resolve `key` as an account id first, then as a name.
    pub async fn find_account(&self, key: &str) -> LedgerResult<Account> {
        if let Ok(id) = key.parse::<AccountId>() {
            if let Some(account) = self.store.account_by_id(id).await? {
                return Ok(account);
            }
        }
        self.get_account(key).await
    }

    pub async fn list_accounts(&self) -> LedgerResult<Vec<Account>> {
        Ok(self.store.list_accounts().await?)
    }

    #[instrument(skip(self), err)]
    pub async fn delete_account(&self, id: AccountId) -> LedgerResult<()> {
        let account = self.get_account_by_id(id).await?;
        if account.is_bank_issuer() {
            return Err(LedgerError::has_references(
                "the bank issuer account cannot be deleted",
            ));
        }

        let _held = self.locks.acquire(&[account.name.as_str()]).await?;
        match self.store.delete_account_unless_linked(id).await? {
            Removal::Deleted => {
                info!(account_id = %id, name = %account.name, "account deleted");
                Ok(())
            }
            Removal::NotFound => Err(LedgerError::not_found(format!("account {id}"))),
            Removal::Referenced => Err(LedgerError::has_references(format!(
                "account '{}' is still linked to a user",
                account.name
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip(self), err)]
    pub async fn create_user(&self, name: &str, account: AccountId) -> LedgerResult<User> {
        let user = User::new(name, account, Utc::now())?;
        match self.store.insert_user_if_absent(&user).await? {
            UserInsert::Inserted => {
                info!(user_id = %user.id, name = %user.name, "user created");
                Ok(user)
            }
            UserInsert::Duplicate => Err(LedgerError::already_exists(format!("user '{}'", user.name))),
            UserInsert::AccountNotFound(missing) => {
                Err(LedgerError::not_found(format!("account {missing}")))
            }
        }
    }

    pub async fn get_user(&self, id: UserId) -> LedgerResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| LedgerError::not_found(format!("user {id}")))
    }

    pub async fn list_users(&self) -> LedgerResult<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    #[instrument(skip(self, accounts), fields(count = accounts.len()), err)]
    pub async fn link_accounts(&self, user: UserId, accounts: &[AccountId]) -> LedgerResult<User> {
        match self.store.link_accounts(user, accounts).await? {
            LinkUpdate::Updated(updated) => {
                debug!(user_id = %user, linked = updated.accounts.len(), "accounts linked");
                Ok(updated)
            }
            LinkUpdate::UserNotFound => Err(LedgerError::not_found(format!("user {user}"))),
            LinkUpdate::AccountNotFound(missing) => {
                Err(LedgerError::not_found(format!("account {missing}")))
            }
        }
    }

    #[instrument(skip(self), err)]
    pub async fn unlink_account(&self, user: UserId, account: AccountId) -> LedgerResult<User> {
        match self.store.unlink_account(user, account).await? {
            LinkUpdate::Updated(updated) => Ok(updated),
            LinkUpdate::UserNotFound => Err(LedgerError::not_found(format!("user {user}"))),
            LinkUpdate::AccountNotFound(account) => Err(LedgerError::not_found(format!(
                "account {account} is not linked to user {user}"
            ))),
        }
    }

    #[instrument(skip(self), err)]
    pub async fn delete_user(&self, id: UserId) -> LedgerResult<()> {
        match self.store.delete_user_unless_linked(id).await? {
            Removal::Deleted => {
                info!(user_id = %id, "user deleted");
                Ok(())
            }
            Removal::NotFound => Err(LedgerError::not_found(format!("user {id}"))),
            Removal::Referenced => Err(LedgerError::has_references(format!(
                "user {id} still has linked accounts"
            ))),
        }
    }

    pub async fn users_linking(&self, account: AccountId) -> LedgerResult<Vec<User>> {
        self.get_account_by_id(account).await?;
        Ok(self.store.users_linking(account).await?)
    }
}

/// A transfer whose writes are staged and whose locks are still held.
struct Settled<'a> {
    tx: Box<dyn LedgerTx + 'a>,
    _held: HeldLocks,
    record: Transaction,
    decision: Decision,
}

fn rejection_error(rejection: Rejection, transaction_id: TransactionId) -> LedgerError {
    match rejection {
        Rejection::ReceiverNotFound => LedgerError::AccountNotFound {
            party: Party::Receiver,
            transaction_id,
        },
        Rejection::SenderNotFound => LedgerError::AccountNotFound {
            party: Party::Sender,
            transaction_id,
        },
        Rejection::InsufficientFunds => LedgerError::InsufficientFunds { transaction_id },
        Rejection::BalanceOverflow => LedgerError::invalid_argument(format!(
            "{} (transaction {transaction_id})",
            rejection.reason()
        )),
    }
}
