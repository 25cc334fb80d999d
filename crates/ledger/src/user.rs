use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankledger_core::{AccountId, LedgerError, LedgerResult, UserId};

/// A user owning zero or more linked accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub accounts: Vec<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: &str, account: AccountId, now: DateTime<Utc>) -> LedgerResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::invalid_argument("user name must not be empty"));
        }

        Ok(Self {
            id: UserId::new(),
            name: name.to_string(),
            accounts: vec![account],
            created_at: now,
        })
    }

    /// Link accounts, ignoring ones already linked. Returns how many were added.
    pub fn link(&mut self, accounts: impl IntoIterator<Item = AccountId>) -> usize {
        let mut added = 0;
        for account in accounts {
            if !self.accounts.contains(&account) {
                self.accounts.push(account);
                added += 1;
            }
        }
        added
    }

    /// Remove a link. Returns `false` if it was not linked.
    pub fn unlink(&mut self, account: AccountId) -> bool {
        let before = self.accounts.len();
        self.accounts.retain(|a| *a != account);
        self.accounts.len() != before
    }

    pub fn links(&self, account: AccountId) -> bool {
        self.accounts.contains(&account)
    }

    /// Deletion guard: a user with any linked account cannot be removed.
    pub fn ensure_deletable(&self) -> LedgerResult<()> {
        if self.accounts.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::has_references(format!(
                "user '{}' still links {} account(s)",
                self.name,
                self.accounts.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_ignores_duplicates() {
        let first = AccountId::new();
        let second = AccountId::new();
        let mut user = User::new("carol", first, Utc::now()).unwrap();

        assert_eq!(user.link([first, second, second]), 1);
        assert_eq!(user.accounts, vec![first, second]);
    }

    #[test]
    fn linked_user_cannot_be_deleted_until_unlinked() {
        let account = AccountId::new();
        let mut user = User::new("dave", account, Utc::now()).unwrap();

        assert!(matches!(user.ensure_deletable(), Err(LedgerError::HasReferences(_))));
        assert!(user.unlink(account));
        assert!(!user.unlink(account));
        assert!(user.ensure_deletable().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(User::new("", AccountId::new(), Utc::now()).is_err());
    }
}
