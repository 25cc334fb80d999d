//! HS256 token minting and verification.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{AuthError, JwtClaims, PrincipalId, Role, validate_claims};

/// Verifies a bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError>;
}

/// Issues signed bearer tokens.
pub trait TokenMinter: Send + Sync {
    fn mint(
        &self,
        principal: PrincipalId,
        role: Role,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError>;
}

/// Shared-secret (HS256) token verifier.
pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time window is checked by `validate_claims` against an explicit `now`.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, AuthError> {
        let data = jsonwebtoken::decode::<JwtClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

/// Shared-secret (HS256) token issuer.
pub struct Hs256TokenMinter {
    key: EncodingKey,
}

impl Hs256TokenMinter {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_ref()),
        }
    }
}

impl TokenMinter for Hs256TokenMinter {
    fn mint(
        &self,
        principal: PrincipalId,
        role: Role,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        if ttl_hours <= 0 {
            return Err(AuthError::Mint("ttl must be positive".to_string()));
        }

        let expires_at = TimeDelta::try_hours(ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AuthError::Mint(format!("ttl of {ttl_hours} hours is out of range")))?;

        let claims = JwtClaims {
            sub: principal,
            role,
            issued_at: now,
            expires_at,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| AuthError::Mint(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenValidationError;
    use chrono::Duration;

    #[test]
    fn minted_token_round_trips() {
        let minter = Hs256TokenMinter::new("secret");
        let validator = Hs256JwtValidator::new("secret");
        let principal = PrincipalId::new();
        let now = Utc::now();

        let token = minter.mint(principal, Role::BANK_ISSUER, 72, now).unwrap();
        let claims = validator.validate(&token, now).unwrap();

        assert_eq!(claims.sub, principal);
        assert_eq!(claims.role, Role::BANK_ISSUER);
        assert_eq!(claims.expires_at.timestamp() - claims.issued_at.timestamp(), 72 * 3_600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = Hs256TokenMinter::new("secret")
            .mint(PrincipalId::new(), Role::BANK_ISSUER, 1, Utc::now())
            .unwrap();

        let err = Hs256JwtValidator::new("other").validate(&token, Utc::now()).unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let now = Utc::now();
        let token = Hs256TokenMinter::new("secret")
            .mint(PrincipalId::new(), Role::BANK_ISSUER, 1, now)
            .unwrap();

        let err = Hs256JwtValidator::new("secret")
            .validate(&token, now + Duration::hours(2))
            .unwrap_err();
        assert_eq!(err, AuthError::Token(TokenValidationError::Expired));
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let err = Hs256TokenMinter::new("secret")
            .mint(PrincipalId::new(), Role::BANK_ISSUER, 0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AuthError::Mint(_)));
    }

    #[test]
    fn out_of_range_ttl_is_rejected() {
        let minter = Hs256TokenMinter::new("secret");

        let err = minter
            .mint(PrincipalId::new(), Role::BANK_ISSUER, i64::MAX, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AuthError::Mint(_)));

        let err = minter
            .mint(PrincipalId::new(), Role::BANK_ISSUER, 10_000_000_000_000, Utc::now())
            .unwrap_err();
        assert!(matches!(err, AuthError::Mint(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = Hs256JwtValidator::new("secret")
            .validate("not.a.jwt", Utc::now())
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }
}
