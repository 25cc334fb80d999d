//! Infrastructure layer: storage backends, the ledger engine, bootstrap and
//! configuration.

pub mod bootstrap;
pub mod config;
pub mod engine;
pub mod locks;
pub mod store;

pub use bootstrap::{BankIssuer, ensure_bank_issuer};
pub use config::{ConfigError, LedgerConfig};
pub use engine::LedgerEngine;
pub use store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore, StoreError};
