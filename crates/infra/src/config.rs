//! Environment-driven configuration.

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 72;
/// One year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 366;
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Clone)]
pub struct LedgerConfig {
    /// Shared secret exchanged for a bank-issuer token (`BANK_256_CODE`).
    pub bank_secret: String,
    pub jwt_secret: String,
    pub addr: SocketAddr,
    /// Postgres is used when set, otherwise the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub transfer_timeout: Duration,
    pub token_ttl_hours: i64,
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("bank_secret", &"<redacted>")
            .field("jwt_secret", &"<redacted>")
            .field("addr", &self.addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("database_max_connections", &self.database_max_connections)
            .field("transfer_timeout", &self.transfer_timeout)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .finish()
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bank_secret = get("BANK_256_CODE");
        let jwt_secret = get("JWT_SECRET");
        let missing: Vec<String> = [("BANK_256_CODE", &bank_secret), ("JWT_SECRET", &jwt_secret)]
            .into_iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.to_string())
            .collect();

        let (Some(bank_secret), Some(jwt_secret)) = (bank_secret, jwt_secret) else {
            return Err(ConfigError::Missing(missing));
        };

        let addr = get("ADDR")
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "ADDR",
                reason: e.to_string(),
            })?;

        let transfer_timeout_ms = parse_or("TRANSFER_TIMEOUT_MS", get("TRANSFER_TIMEOUT_MS"), DEFAULT_TRANSFER_TIMEOUT_MS)?;
        if transfer_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                var: "TRANSFER_TIMEOUT_MS",
                reason: "must be positive".to_string(),
            });
        }

        let token_ttl_hours = parse_or("TOKEN_TTL_HOURS", get("TOKEN_TTL_HOURS"), DEFAULT_TOKEN_TTL_HOURS)?;
        if !(1..=MAX_TOKEN_TTL_HOURS).contains(&token_ttl_hours) {
            return Err(ConfigError::Invalid {
                var: "TOKEN_TTL_HOURS",
                reason: format!("must be between 1 and {MAX_TOKEN_TTL_HOURS}"),
            });
        }

        let database_max_connections = parse_or(
            "DATABASE_MAX_CONNECTIONS",
            get("DATABASE_MAX_CONNECTIONS"),
            DEFAULT_DATABASE_MAX_CONNECTIONS,
        )?;

        Ok(Self {
            bank_secret,
            jwt_secret,
            addr,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            transfer_timeout: Duration::from_millis(transfer_timeout_ms),
            token_ttl_hours,
        })
    }
}

fn parse_or<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secrets_are_set() {
        let cfg = LedgerConfig::from_lookup(lookup(&[("BANK_256_CODE", "b"), ("JWT_SECRET", "j")])).unwrap();

        assert_eq!(cfg.addr, DEFAULT_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.database_url, None);
        assert_eq!(cfg.transfer_timeout, Duration::from_millis(5_000));
        assert_eq!(cfg.token_ttl_hours, 72);
    }

    #[test]
    fn all_missing_secrets_are_reported_together() {
        let err = LedgerConfig::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Missing(vec!["BANK_256_CODE".to_string(), "JWT_SECRET".to_string()])
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = LedgerConfig::from_lookup(lookup(&[
            ("BANK_256_CODE", "b"),
            ("JWT_SECRET", "j"),
            ("TRANSFER_TIMEOUT_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "TRANSFER_TIMEOUT_MS", .. }));

        let err = LedgerConfig::from_lookup(lookup(&[
            ("BANK_256_CODE", "b"),
            ("JWT_SECRET", "j"),
            ("ADDR", "nowhere"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "ADDR", .. }));
    }

    #[test]
    fn token_ttl_is_bounded() {
        let with_ttl = |ttl: &str| {
            LedgerConfig::from_lookup(lookup(&[
                ("BANK_256_CODE", "b"),
                ("JWT_SECRET", "j"),
                ("TOKEN_TTL_HOURS", ttl),
            ]))
        };

        assert_eq!(with_ttl("8784").unwrap().token_ttl_hours, MAX_TOKEN_TTL_HOURS);
        for bad in ["0", "-1", "8785", "10000000000000"] {
            let err = with_ttl(bad).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { var: "TOKEN_TTL_HOURS", .. }), "{bad}");
        }
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = LedgerConfig::from_lookup(lookup(&[
            ("BANK_256_CODE", "top-secret-code"),
            ("JWT_SECRET", "top-secret-jwt"),
            ("DATABASE_URL", "postgres://user:pw@db/ledger"),
        ]))
        .unwrap();
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(!rendered.contains("pw@db"));
        assert!(cfg.database_url.is_some());
    }
}
