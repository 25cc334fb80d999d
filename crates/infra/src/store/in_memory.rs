use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use bankledger_core::{AccountId, TransactionId, UserId};
use bankledger_ledger::{Account, Transaction, User};

use super::r#trait::{LedgerStore, LedgerTx, LinkUpdate, Removal, StoreError, UserInsert};

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    account_names: HashMap<String, AccountId>,
    /// Append-only log; position is the append order.
    log: Vec<Transaction>,
    log_index: HashMap<TransactionId, usize>,
    users: HashMap<UserId, User>,
    user_names: HashMap<String, UserId>,
}

impl State {
    fn account_named_mut(&mut self, name: &str) -> Option<&mut Account> {
        let id = self.account_names.get(name)?;
        self.accounts.get_mut(id)
    }

    fn sorted_accounts(&self) -> Vec<Account> {
        let mut accounts: Vec<Account> = self.accounts.values().cloned().collect();
        accounts.sort_by_key(|a| a.id);
        accounts
    }

    fn sorted_users(&self, filter: impl Fn(&User) -> bool) -> Vec<User> {
        let mut users: Vec<User> = self.users.values().filter(|u| filter(u)).cloned().collect();
        users.sort_by_key(|u| u.id);
        users
    }
}

/// In-memory ledger store.
///
/// Intended for tests/dev. A single `RwLock` guards all collections, so every
/// trait method is atomic with respect to every other one.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

/// Staged writes applied under one write lock on commit.
struct InMemoryTx<'a> {
    store: &'a InMemoryLedgerStore,
    deltas: Vec<(String, i64)>,
    appends: Vec<Transaction>,
}

impl InMemoryTx<'_> {
    fn staged_delta(&self, name: &str) -> i64 {
        self.deltas
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, d)| *d)
            .sum()
    }
}

#[async_trait]
impl LedgerTx for InMemoryTx<'_> {
    async fn balance_for_update(&mut self, name: &str) -> Result<Option<i64>, StoreError> {
        let state = self.store.read()?;
        let Some(id) = state.account_names.get(name) else {
            return Ok(None);
        };
        let balance = state.accounts.get(id).map(|a| a.balance).unwrap_or_default();
        Ok(Some(balance + self.staged_delta(name)))
    }

    async fn adjust_balance(&mut self, name: &str, delta: i64) -> Result<(), StoreError> {
        self.deltas.push((name.to_string(), delta));
        Ok(())
    }

    async fn append_transaction(&mut self, record: &Transaction) -> Result<(), StoreError> {
        self.appends.push(record.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx {
            store,
            deltas,
            appends,
        } = *self;
        let mut state = store.write()?;

        // Compute every new balance before touching state so a failure leaves
        // nothing applied.
        let mut updated: HashMap<&str, i64> = HashMap::new();
        for (name, delta) in &deltas {
            let current = match updated.get(name.as_str()) {
                Some(b) => *b,
                None => {
                    let id = state
                        .account_names
                        .get(name)
                        .ok_or_else(|| StoreError::Vanished(name.clone()))?;
                    state.accounts.get(id).map(|a| a.balance).unwrap_or_default()
                }
            };
            let next = current
                .checked_add(*delta)
                .ok_or_else(|| StoreError::Overflow(name.clone()))?;
            updated.insert(name.as_str(), next);
        }

        for (name, balance) in updated {
            if let Some(account) = state.account_named_mut(name) {
                account.balance = balance;
            }
        }
        for record in appends {
            let position = state.log.len();
            state.log_index.insert(record.id, position);
            state.log.push(record);
        }

        Ok(())
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert_account_if_absent(&self, account: &Account) -> Result<bool, StoreError> {
        let mut state = self.write()?;
        if state.account_names.contains_key(&account.name) {
            return Ok(false);
        }
        state.account_names.insert(account.name.clone(), account.id);
        state.accounts.insert(account.id, account.clone());
        Ok(true)
    }

    async fn account_by_name(&self, name: &str) -> Result<Option<Account>, StoreError> {
        let state = self.read()?;
        Ok(state
            .account_names
            .get(name)
            .and_then(|id| state.accounts.get(id))
            .cloned())
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        Ok(self.read()?.sorted_accounts())
    }

    async fn delete_account_unless_linked(&self, id: AccountId) -> Result<Removal, StoreError> {
        let mut state = self.write()?;
        if !state.accounts.contains_key(&id) {
            return Ok(Removal::NotFound);
        }
        if state.users.values().any(|u| u.links(id)) {
            return Ok(Removal::Referenced);
        }
        if let Some(account) = state.accounts.remove(&id) {
            state.account_names.remove(&account.name);
        }
        Ok(Removal::Deleted)
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, StoreError> {
        Ok(Box::new(InMemoryTx {
            store: self,
            deltas: Vec::new(),
            appends: Vec::new(),
        }))
    }

    async fn transaction_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let state = self.read()?;
        Ok(state.log_index.get(&id).map(|&i| state.log[i].clone()))
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        Ok(self.read()?.log.clone())
    }

    async fn transactions_involving(&self, account: &str) -> Result<Vec<Transaction>, StoreError> {
        Ok(self
            .read()?
            .log
            .iter()
            .filter(|t| t.involves(account))
            .cloned()
            .collect())
    }

    async fn insert_user_if_absent(&self, user: &User) -> Result<UserInsert, StoreError> {
        let mut state = self.write()?;
        if state.user_names.contains_key(&user.name) {
            return Ok(UserInsert::Duplicate);
        }
        if let Some(missing) = user.accounts.iter().find(|a| !state.accounts.contains_key(*a)) {
            return Ok(UserInsert::AccountNotFound(*missing));
        }
        state.user_names.insert(user.name.clone(), user.id);
        state.users.insert(user.id, user.clone());
        Ok(UserInsert::Inserted)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.sorted_users(|_| true))
    }

    async fn users_linking(&self, account: AccountId) -> Result<Vec<User>, StoreError> {
        Ok(self.read()?.sorted_users(|u| u.links(account)))
    }

    async fn link_accounts(&self, user: UserId, accounts: &[AccountId]) -> Result<LinkUpdate, StoreError> {
        let mut state = self.write()?;
        if !state.users.contains_key(&user) {
            return Ok(LinkUpdate::UserNotFound);
        }
        if let Some(missing) = accounts.iter().find(|a| !state.accounts.contains_key(*a)) {
            return Ok(LinkUpdate::AccountNotFound(*missing));
        }
        match state.users.get_mut(&user) {
            Some(u) => {
                u.link(accounts.iter().copied());
                Ok(LinkUpdate::Updated(u.clone()))
            }
            None => Ok(LinkUpdate::UserNotFound),
        }
    }

    async fn unlink_account(&self, user: UserId, account: AccountId) -> Result<LinkUpdate, StoreError> {
        let mut state = self.write()?;
        match state.users.get_mut(&user) {
            Some(u) => {
                if !u.unlink(account) {
                    return Ok(LinkUpdate::AccountNotFound(account));
                }
                Ok(LinkUpdate::Updated(u.clone()))
            }
            None => Ok(LinkUpdate::UserNotFound),
        }
    }

    async fn delete_user_unless_linked(&self, id: UserId) -> Result<Removal, StoreError> {
        let mut state = self.write()?;
        let Some(user) = state.users.get(&id) else {
            return Ok(Removal::NotFound);
        };
        if user.ensure_deletable().is_err() {
            return Ok(Removal::Referenced);
        }
        if let Some(user) = state.users.remove(&id) {
            state.user_names.remove(&user.name);
        }
        Ok(Removal::Deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankledger_ledger::TransferRequest;
    use chrono::Utc;

    fn account(name: &str, balance: i64) -> Account {
        Account::open(name, balance, Utc::now()).unwrap()
    }

    fn record(sender: &str, receiver: &str, amount: i64) -> Transaction {
        let request = TransferRequest {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            memo: "test".to_string(),
        };
        Transaction::pending(&request, Utc::now()).commit()
    }

    #[tokio::test]
    async fn duplicate_names_are_refused() {
        let store = InMemoryLedgerStore::new();
        assert!(store.insert_account_if_absent(&account("a", 0)).await.unwrap());
        assert!(!store.insert_account_if_absent(&account("a", 5)).await.unwrap());
        assert_eq!(store.list_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn uncommitted_unit_leaves_no_trace() {
        let store = InMemoryLedgerStore::new();
        store.insert_account_if_absent(&account("a", 10)).await.unwrap();
        store.insert_account_if_absent(&account("b", 0)).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.adjust_balance("a", -10).await.unwrap();
            tx.adjust_balance("b", 10).await.unwrap();
            tx.append_transaction(&record("a", "b", 10)).await.unwrap();
            assert_eq!(tx.balance_for_update("a").await.unwrap(), Some(0));
        }

        assert_eq!(store.account_by_name("a").await.unwrap().unwrap().balance, 10);
        assert_eq!(store.account_by_name("b").await.unwrap().unwrap().balance, 0);
        assert!(store.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn committed_unit_applies_everything() {
        let store = InMemoryLedgerStore::new();
        store.insert_account_if_absent(&account("a", 10)).await.unwrap();
        store.insert_account_if_absent(&account("b", 0)).await.unwrap();
        let rec = record("a", "b", 4);

        let mut tx = store.begin().await.unwrap();
        tx.adjust_balance("a", -4).await.unwrap();
        tx.adjust_balance("b", 4).await.unwrap();
        tx.append_transaction(&rec).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.account_by_name("a").await.unwrap().unwrap().balance, 6);
        assert_eq!(store.account_by_name("b").await.unwrap().unwrap().balance, 4);
        assert_eq!(store.transaction_by_id(rec.id).await.unwrap(), Some(rec.clone()));
        assert_eq!(store.transactions_involving("b").await.unwrap(), vec![rec]);
    }

    #[tokio::test]
    async fn commit_against_a_deleted_account_applies_nothing() {
        let store = InMemoryLedgerStore::new();
        let a = account("a", 10);
        store.insert_account_if_absent(&a).await.unwrap();
        store.insert_account_if_absent(&account("b", 0)).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.adjust_balance("b", 1).await.unwrap();
        tx.adjust_balance("a", -1).await.unwrap();
        tx.append_transaction(&record("a", "b", 1)).await.unwrap();

        assert_eq!(store.delete_account_unless_linked(a.id).await.unwrap(), Removal::Deleted);
        assert!(matches!(tx.commit().await, Err(StoreError::Vanished(name)) if name == "a"));

        assert_eq!(store.account_by_name("b").await.unwrap().unwrap().balance, 0);
        assert!(store.list_transactions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn linked_account_cannot_be_deleted() {
        let store = InMemoryLedgerStore::new();
        let a = account("a", 0);
        store.insert_account_if_absent(&a).await.unwrap();
        let user = User::new("alice", a.id, Utc::now()).unwrap();
        assert_eq!(store.insert_user_if_absent(&user).await.unwrap(), UserInsert::Inserted);

        assert_eq!(store.delete_account_unless_linked(a.id).await.unwrap(), Removal::Referenced);
        assert_eq!(store.users_linking(a.id).await.unwrap(), vec![user.clone()]);

        store.unlink_account(user.id, a.id).await.unwrap();
        assert_eq!(store.delete_account_unless_linked(a.id).await.unwrap(), Removal::Deleted);
        assert_eq!(store.delete_account_unless_linked(a.id).await.unwrap(), Removal::NotFound);
    }

    #[tokio::test]
    async fn user_links_must_point_at_existing_accounts() {
        let store = InMemoryLedgerStore::new();
        let a = account("a", 0);
        store.insert_account_if_absent(&a).await.unwrap();
        let ghost = AccountId::new();

        let orphan = User::new("bob", ghost, Utc::now()).unwrap();
        assert_eq!(
            store.insert_user_if_absent(&orphan).await.unwrap(),
            UserInsert::AccountNotFound(ghost)
        );

        let user = User::new("carol", a.id, Utc::now()).unwrap();
        store.insert_user_if_absent(&user).await.unwrap();
        assert_eq!(
            store.link_accounts(user.id, &[ghost]).await.unwrap(),
            LinkUpdate::AccountNotFound(ghost)
        );
        assert_eq!(
            store.link_accounts(UserId::new(), &[a.id]).await.unwrap(),
            LinkUpdate::UserNotFound
        );
    }
}
