use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bankledger_core::{AccountId, LedgerError, LedgerResult};

/// Name of the distinguished bank-issuer account.
pub const BANK_ISSUER_NAME: &str = "BANK_ISSUER";

/// A named account holding a current balance.
///
/// The balance is only ever changed by the transfer engine; callers can open
/// an account with an opening balance but never adjust it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Validate and build a new account record.
    pub fn open(name: &str, opening_balance: i64, now: DateTime<Utc>) -> LedgerResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::invalid_argument("account name must not be empty"));
        }
        if opening_balance < 0 {
            return Err(LedgerError::invalid_argument(
                "opening balance must not be negative",
            ));
        }

        Ok(Self {
            id: AccountId::new(),
            name: name.to_string(),
            balance: opening_balance,
            created_at: now,
        })
    }

    /// The bank-issuer singleton starts empty.
    pub fn bank_issuer(now: DateTime<Utc>) -> Self {
        Self {
            id: AccountId::new(),
            name: BANK_ISSUER_NAME.to_string(),
            balance: 0,
            created_at: now,
        }
    }

    pub fn is_bank_issuer(&self) -> bool {
        self.name == BANK_ISSUER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_trims_the_name() {
        let account = Account::open("  alice ", 10, Utc::now()).unwrap();
        assert_eq!(account.name, "alice");
        assert_eq!(account.balance, 10);
        assert!(!account.is_bank_issuer());
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = Account::open("   ", 0, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[test]
    fn negative_opening_balance_is_rejected() {
        let err = Account::open("bob", -1, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidArgument(_)));
    }

    #[test]
    fn bank_issuer_is_named_and_empty() {
        let issuer = Account::bank_issuer(Utc::now());
        assert!(issuer.is_bank_issuer());
        assert_eq!(issuer.balance, 0);
    }
}
