//! Infrastructure wiring: store selection, engine bootstrap, token issuing.

use std::sync::Arc;

use anyhow::Context;

use bankledger_auth::{Hs256JwtValidator, Hs256TokenMinter, IssuerGate, JwtValidator, PrincipalId};
use bankledger_infra::{InMemoryLedgerStore, LedgerConfig, LedgerEngine, LedgerStore, PostgresLedgerStore};

pub type SharedStore = Arc<dyn LedgerStore>;
pub type Engine = LedgerEngine<SharedStore>;

#[derive(Clone)]
pub struct AppServices {
    pub engine: Arc<Engine>,
    pub issuer_gate: Arc<IssuerGate>,
    pub jwt: Arc<dyn JwtValidator>,
}

impl AppServices {
    /// Wire services around an already-open store.
    pub async fn with_store(store: SharedStore, config: &LedgerConfig) -> anyhow::Result<Self> {
        let engine = LedgerEngine::bootstrap(store, config.transfer_timeout)
            .await
            .context("failed to bootstrap the bank issuer account")?;

        let issuer = PrincipalId::from_uuid(*engine.issuer().id.as_uuid());
        let minter = Arc::new(Hs256TokenMinter::new(config.jwt_secret.as_bytes()));
        let issuer_gate = IssuerGate::new(
            config.bank_secret.as_bytes(),
            issuer,
            minter,
            config.token_ttl_hours,
        );

        Ok(Self {
            engine: Arc::new(engine),
            issuer_gate: Arc::new(issuer_gate),
            jwt: Arc::new(Hs256JwtValidator::new(config.jwt_secret.as_bytes())),
        })
    }
}

/// Postgres when `DATABASE_URL` is set, otherwise the in-memory store.
pub async fn build_services(config: &LedgerConfig) -> anyhow::Result<AppServices> {
    let store: SharedStore = match &config.database_url {
        Some(url) => {
            let store = PostgresLedgerStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store.migrate().await.context("failed to apply schema")?;
            tracing::info!("using postgres ledger store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory ledger store");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    AppServices::with_store(store, config).await
}
