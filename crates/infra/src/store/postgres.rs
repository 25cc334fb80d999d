//! Postgres-backed ledger store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | Outcome |
//! |------------|----------------------|---------|
//! | Database (unique violation) | `23505` | handled by `ON CONFLICT DO NOTHING`, never surfaces |
//! | Database (foreign key violation) | `23503` | `AccountNotFound` on link inserts, `Referenced` on account delete |
//! | Database (numeric out of range) | `22003` | `StoreError::Overflow` on balance updates |
//! | Database (other) | Any other | `StoreError::Database` |
//! | Any other | N/A | `StoreError::Database` |
//!
//! Balance mutations run inside a `PgLedgerTx`, which holds row locks taken
//! with `SELECT ... FOR UPDATE` until it commits or is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgExecutor, PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction as SqlxTransaction};
use tracing::{Span, instrument};
use uuid::Uuid;

use bankledger_core::{AccountId, TransactionId, UserId};
use bankledger_ledger::{Account, Transaction, TransactionStatus, User};

use super::r#trait::{LedgerStore, LedgerTx, LinkUpdate, Removal, StoreError, UserInsert};

const SCHEMA: &str = include_str!("../../migrations/0001_ledger.sql");

const USER_SELECT: &str = r#"
    SELECT
        u.id,
        u.name,
        u.created_at,
        COALESCE(
            array_agg(ua.account_id ORDER BY ua.position) FILTER (WHERE ua.account_id IS NOT NULL),
            '{}'
        ) AS accounts
    FROM users u
    LEFT JOIN user_accounts ua ON ua.user_id = u.id
"#;

const TRANSACTION_COLUMNS: &str =
    "id, amount, memo, occurred_at, status, sender, receiver, reason";

#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: PgPool,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `url`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open unit of work. Dropping it rolls back.
struct PgLedgerTx {
    tx: SqlxTransaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    #[instrument(skip(self), err)]
    async fn balance_for_update(&mut self, name: &str) -> Result<Option<i64>, StoreError> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE name = $1 FOR UPDATE")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("balance_for_update", e))?;

        row.map(|r| {
            r.try_get::<i64, _>("balance")
                .map_err(|e| corrupt("accounts", e))
        })
        .transpose()
    }

    #[instrument(skip(self), err)]
    async fn adjust_balance(&mut self, name: &str, delta: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE name = $1")
            .bind(name)
            .bind(delta)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if has_code(&e, "22003") {
                    StoreError::Overflow(name.to_string())
                } else {
                    map_sqlx_error("adjust_balance", e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Vanished(name.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, record), fields(transaction_id = %record.id), err)]
    async fn append_transaction(&mut self, record: &Transaction) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id,
                amount,
                memo,
                occurred_at,
                status,
                sender,
                receiver,
                reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.amount)
        .bind(&record.memo)
        .bind(record.timestamp)
        .bind(record.status.as_str())
        .bind(&record.sender)
        .bind(&record.receiver)
        .bind(record.reason.as_deref())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("append_transaction", e))?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, account), fields(account = %account.name), err)]
    async fn insert_account_if_absent(&self, account: &Account) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (id, name, balance, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.name)
        .bind(account.balance)
        .bind(account.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_account", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn account_by_name(&self, name: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, name, balance, created_at FROM accounts WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("account_by_name", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn account_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT id, name, balance, created_at FROM accounts WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("account_by_id", e))?;
        row.as_ref().map(account_from_row).transpose()
    }

    async fn list_accounts(&self) -> Result<Vec<Account>, StoreError> {
        let rows = sqlx::query("SELECT id, name, balance, created_at FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_accounts", e))?;
        rows.iter().map(account_from_row).collect()
    }

    #[instrument(skip(self), fields(account_id = %id, deleted = tracing::field::Empty), err)]
    async fn delete_account_unless_linked(&self, id: AccountId) -> Result<Removal, StoreError> {
        let row = sqlx::query(
            r#"
            WITH target AS (
                SELECT id FROM accounts WHERE id = $1
            ),
            deleted AS (
                DELETE FROM accounts
                WHERE id = $1
                  AND NOT EXISTS (SELECT 1 FROM user_accounts WHERE account_id = $1)
                RETURNING id
            )
            SELECT
                EXISTS (SELECT 1 FROM target) AS existed,
                EXISTS (SELECT 1 FROM deleted) AS deleted
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await;

        let row = match row {
            Ok(row) => row,
            // A link committed between the check and the delete.
            Err(e) if has_code(&e, "23503") => return Ok(Removal::Referenced),
            Err(e) => return Err(map_sqlx_error("delete_account", e)),
        };

        let existed: bool = row.try_get("existed").map_err(|e| corrupt("accounts", e))?;
        let deleted: bool = row.try_get("deleted").map_err(|e| corrupt("accounts", e))?;
        Span::current().record("deleted", deleted);

        Ok(match (existed, deleted) {
            (_, true) => Removal::Deleted,
            (true, false) => Removal::Referenced,
            (false, false) => Removal::NotFound,
        })
    }

    async fn begin(&self) -> Result<Box<dyn LedgerTx + '_>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn transaction_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transaction_by_id", e))?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY seq ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions", e))?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn transactions_involving(&self, account: &str) -> Result<Vec<Transaction>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE sender = $1 OR receiver = $1 ORDER BY seq ASC"
        ))
        .bind(account)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("transactions_involving", e))?;
        rows.iter().map(transaction_from_row).collect()
    }

    #[instrument(skip(self, user), fields(user = %user.name), err)]
    async fn insert_user_if_absent(&self, user: &User) -> Result<UserInsert, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO users (id, name, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.name)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        if inserted.rows_affected() == 0 {
            return Ok(UserInsert::Duplicate);
        }

        for account in &user.accounts {
            if let Err(e) = insert_link(&mut tx, user.id, *account).await {
                if has_code(&e, "23503") {
                    return Ok(UserInsert::AccountNotFound(*account));
                }
                return Err(map_sqlx_error("insert_user_link", e));
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(UserInsert::Inserted)
    }

    async fn user_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        fetch_user(&self.pool, id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!("{USER_SELECT} GROUP BY u.id ORDER BY u.id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn users_linking(&self, account: AccountId) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "{USER_SELECT} \
             WHERE u.id IN (SELECT user_id FROM user_accounts WHERE account_id = $1) \
             GROUP BY u.id ORDER BY u.id"
        ))
        .bind(account.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("users_linking", e))?;
        rows.iter().map(user_from_row).collect()
    }

    #[instrument(skip(self, accounts), fields(user_id = %user, count = accounts.len()), err)]
    async fn link_accounts(&self, user: UserId, accounts: &[AccountId]) -> Result<LinkUpdate, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let exists = sqlx::query("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(user.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_user", e))?;
        if exists.is_none() {
            return Ok(LinkUpdate::UserNotFound);
        }

        for account in accounts {
            if let Err(e) = insert_link(&mut tx, user, *account).await {
                if has_code(&e, "23503") {
                    return Ok(LinkUpdate::AccountNotFound(*account));
                }
                return Err(map_sqlx_error("insert_user_link", e));
            }
        }

        let updated = fetch_user(&mut *tx, user).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(match updated {
            Some(u) => LinkUpdate::Updated(u),
            None => LinkUpdate::UserNotFound,
        })
    }

    #[instrument(skip(self), fields(user_id = %user, account_id = %account), err)]
    async fn unlink_account(&self, user: UserId, account: AccountId) -> Result<LinkUpdate, StoreError> {
        let result = sqlx::query("DELETE FROM user_accounts WHERE user_id = $1 AND account_id = $2")
            .bind(user.as_uuid())
            .bind(account.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("unlink_account", e))?;

        match fetch_user(&self.pool, user).await? {
            None => Ok(LinkUpdate::UserNotFound),
            Some(_) if result.rows_affected() == 0 => Ok(LinkUpdate::AccountNotFound(account)),
            Some(u) => Ok(LinkUpdate::Updated(u)),
        }
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete_user_unless_linked(&self, id: UserId) -> Result<Removal, StoreError> {
        let row = sqlx::query(
            r#"
            WITH target AS (
                SELECT id FROM users WHERE id = $1
            ),
            deleted AS (
                DELETE FROM users
                WHERE id = $1
                  AND NOT EXISTS (SELECT 1 FROM user_accounts WHERE user_id = $1)
                RETURNING id
            )
            SELECT
                EXISTS (SELECT 1 FROM target) AS existed,
                EXISTS (SELECT 1 FROM deleted) AS deleted
            "#,
        )
        .bind(id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("delete_user", e))?;

        let existed: bool = row.try_get("existed").map_err(|e| corrupt("users", e))?;
        let deleted: bool = row.try_get("deleted").map_err(|e| corrupt("users", e))?;

        Ok(match (existed, deleted) {
            (_, true) => Removal::Deleted,
            (true, false) => Removal::Referenced,
            (false, false) => Removal::NotFound,
        })
    }
}

async fn insert_link(
    tx: &mut SqlxTransaction<'_, Postgres>,
    user: UserId,
    account: AccountId,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_accounts (user_id, account_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, account_id) DO NOTHING
        "#,
    )
    .bind(user.as_uuid())
    .bind(account.as_uuid())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn fetch_user<'e, E>(executor: E, id: UserId) -> Result<Option<User>, StoreError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query(&format!("{USER_SELECT} WHERE u.id = $1 GROUP BY u.id"))
        .bind(id.as_uuid())
        .fetch_optional(executor)
        .await
        .map_err(|e| map_sqlx_error("user_by_id", e))?;
    row.as_ref().map(user_from_row).transpose()
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("accounts", e))?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(|e| corrupt("accounts", e))?;
    Ok(Account {
        id: AccountId::from_uuid(id),
        name: row.try_get("name").map_err(|e| corrupt("accounts", e))?,
        balance: row.try_get("balance").map_err(|e| corrupt("accounts", e))?,
        created_at,
    })
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("transactions", e))?;
    let status: String = row.try_get("status").map_err(|e| corrupt("transactions", e))?;
    let status = TransactionStatus::parse(&status).ok_or_else(|| StoreError::Corrupt {
        table: "transactions",
        message: format!("unknown status '{status}'"),
    })?;

    Ok(Transaction {
        id: TransactionId::from_uuid(id),
        amount: row.try_get("amount").map_err(|e| corrupt("transactions", e))?,
        memo: row.try_get("memo").map_err(|e| corrupt("transactions", e))?,
        timestamp: row.try_get("occurred_at").map_err(|e| corrupt("transactions", e))?,
        status,
        sender: row.try_get("sender").map_err(|e| corrupt("transactions", e))?,
        receiver: row.try_get("receiver").map_err(|e| corrupt("transactions", e))?,
        reason: row.try_get("reason").map_err(|e| corrupt("transactions", e))?,
    })
}

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let id: Uuid = row.try_get("id").map_err(|e| corrupt("users", e))?;
    let accounts: Vec<Uuid> = row.try_get("accounts").map_err(|e| corrupt("users", e))?;
    Ok(User {
        id: UserId::from_uuid(id),
        name: row.try_get("name").map_err(|e| corrupt("users", e))?,
        accounts: accounts.into_iter().map(AccountId::from_uuid).collect(),
        created_at: row.try_get("created_at").map_err(|e| corrupt("users", e))?,
    })
}

fn corrupt(table: &'static str, err: sqlx::Error) -> StoreError {
    StoreError::Corrupt {
        table,
        message: err.to_string(),
    }
}

fn has_code(err: &sqlx::Error, code: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(code),
        _ => false,
    }
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    let message = match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("[{code}] {}", db_err.message()),
            None => db_err.message().to_string(),
        },
        sqlx::Error::PoolClosed => "connection pool closed".to_string(),
        sqlx::Error::PoolTimedOut => "timed out acquiring a connection".to_string(),
        other => other.to_string(),
    };
    StoreError::Database { operation, message }
}
