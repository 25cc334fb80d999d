//! Ledger persistence boundary.
//!
//! Accounts, the append-only transaction log and users live behind
//! [`LedgerStore`]. Two backends ship: an in-memory one for tests and local
//! runs, and Postgres.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use r#trait::{LedgerStore, LedgerTx, LinkUpdate, Removal, StoreError, UserInsert};
