//! Bank-issuer account bootstrap.

use chrono::Utc;
use tracing::{debug, info};

use bankledger_core::{AccountId, LedgerError, LedgerResult};
use bankledger_ledger::{Account, BANK_ISSUER_NAME};

use crate::store::LedgerStore;

/// Identity of the bank-issuer account, resolved once at startup and passed
/// to whoever needs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankIssuer {
    pub id: AccountId,
    pub name: String,
}

/// Make sure the bank-issuer account exists and return its identity.
///
/// Safe to call any number of times, including from concurrent starts: the
/// account is created with a single insert-if-absent and then read back, so
/// every caller sees the same id.
pub async fn ensure_bank_issuer<S>(store: &S) -> LedgerResult<BankIssuer>
where
    S: LedgerStore + ?Sized,
{
    let candidate = Account::bank_issuer(Utc::now());
    let created = store.insert_account_if_absent(&candidate).await?;

    let account = store
        .account_by_name(BANK_ISSUER_NAME)
        .await?
        .ok_or_else(|| LedgerError::store("bank issuer account missing after bootstrap"))?;

    if created {
        info!(account_id = %account.id, "created bank issuer account");
    } else {
        debug!(account_id = %account.id, "bank issuer account already present");
    }

    Ok(BankIssuer {
        id: account.id,
        name: account.name,
    })
}
