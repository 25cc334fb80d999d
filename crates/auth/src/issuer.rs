//! Bank-issuer token exchange.
//!
//! The holder of the shared issuer secret can trade it for a token carrying
//! [`Role::BANK_ISSUER`] whose subject is the bank-issuer account. This is the
//! only path that ever mints the privileged role.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

use crate::{AuthError, PrincipalId, Role, TokenMinter};

pub struct IssuerGate {
    secret: Vec<u8>,
    issuer: PrincipalId,
    minter: Arc<dyn TokenMinter>,
    ttl_hours: i64,
}

impl IssuerGate {
    pub fn new(
        secret: impl Into<Vec<u8>>,
        issuer: PrincipalId,
        minter: Arc<dyn TokenMinter>,
        ttl_hours: i64,
    ) -> Self {
        Self {
            secret: secret.into(),
            issuer,
            minter,
            ttl_hours,
        }
    }

    pub fn issuer(&self) -> PrincipalId {
        self.issuer
    }

    /// Exchange the presented secret for a privileged token.
    pub fn exchange(&self, presented: &str, now: DateTime<Utc>) -> Result<String, AuthError> {
        if self.secret.is_empty() || !bool::from(self.secret.as_slice().ct_eq(presented.as_bytes())) {
            tracing::warn!("issuer secret rejected");
            return Err(AuthError::InvalidIssuerSecret);
        }

        let token = self
            .minter
            .mint(self.issuer, Role::BANK_ISSUER, self.ttl_hours, now)?;
        tracing::info!(principal = %self.issuer, ttl_hours = self.ttl_hours, "issued bank-issuer token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hs256JwtValidator, Hs256TokenMinter, JwtValidator};

    fn gate(secret: &str) -> IssuerGate {
        IssuerGate::new(
            secret,
            PrincipalId::new(),
            Arc::new(Hs256TokenMinter::new("jwt")),
            72,
        )
    }

    #[test]
    fn correct_secret_yields_issuer_token() {
        let gate = gate("s3cret");
        let now = Utc::now();
        let token = gate.exchange("s3cret", now).unwrap();

        let claims = Hs256JwtValidator::new("jwt").validate(&token, now).unwrap();
        assert_eq!(claims.sub, gate.issuer());
        assert_eq!(claims.role, Role::BANK_ISSUER);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let gate = gate("s3cret");
        assert_eq!(gate.exchange("s3cre", Utc::now()), Err(AuthError::InvalidIssuerSecret));
        assert_eq!(gate.exchange("s3cres", Utc::now()), Err(AuthError::InvalidIssuerSecret));
    }

    #[test]
    fn secret_sharing_a_prefix_is_rejected() {
        let gate = gate("s3cret");
        assert_eq!(gate.exchange("s3cret ", Utc::now()), Err(AuthError::InvalidIssuerSecret));
        assert_eq!(gate.exchange("S3cret", Utc::now()), Err(AuthError::InvalidIssuerSecret));
    }

    #[test]
    fn oversized_ttl_surfaces_as_mint_error() {
        let gate = IssuerGate::new(
            "s3cret",
            PrincipalId::new(),
            Arc::new(Hs256TokenMinter::new("jwt")),
            10_000_000_000_000,
        );
        assert!(matches!(gate.exchange("s3cret", Utc::now()), Err(AuthError::Mint(_))));
    }

    #[test]
    fn empty_configured_secret_never_matches() {
        assert_eq!(gate("").exchange("", Utc::now()), Err(AuthError::InvalidIssuerSecret));
    }
}
