use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{JwtClaims, JwtValidator, Role, TokenValidationError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing credential")]
    MissingCredential,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error(transparent)]
    Token(#[from] TokenValidationError),

    #[error("forbidden: role '{required}' required")]
    RoleMismatch { required: String },

    #[error("invalid issuer secret")]
    InvalidIssuerSecret,

    #[error("failed to mint token: {0}")]
    Mint(String),
}

/// Verify `credential` and require it to carry `required` as its role.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(
    validator: &dyn JwtValidator,
    credential: &str,
    required: &Role,
    now: DateTime<Utc>,
) -> Result<JwtClaims, AuthError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(AuthError::MissingCredential);
    }

    let claims = validator.validate(credential, now)?;
    if &claims.role != required {
        tracing::debug!(
            principal = %claims.sub,
            role = %claims.role,
            required = %required,
            "role mismatch"
        );
        return Err(AuthError::RoleMismatch {
            required: required.as_str().to_string(),
        });
    }

    Ok(claims)
}

/// Boolean form of [`authorize`].
pub fn is_authorized(
    validator: &dyn JwtValidator,
    credential: &str,
    required: &Role,
    now: DateTime<Utc>,
) -> bool {
    authorize(validator, credential, required, now).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Hs256JwtValidator, Hs256TokenMinter, PrincipalId, TokenMinter};

    const SECRET: &str = "test-secret";

    fn token_with(role: Role) -> String {
        Hs256TokenMinter::new(SECRET)
            .mint(PrincipalId::new(), role, 1, Utc::now())
            .unwrap()
    }

    #[test]
    fn issuer_token_is_authorized_for_issuer_role() {
        let validator = Hs256JwtValidator::new(SECRET);
        let token = token_with(Role::BANK_ISSUER);

        let claims = authorize(&validator, &token, &Role::BANK_ISSUER, Utc::now()).unwrap();
        assert_eq!(claims.role, Role::BANK_ISSUER);
    }

    #[test]
    fn other_roles_are_forbidden() {
        let validator = Hs256JwtValidator::new(SECRET);
        let token = token_with(Role::new("viewer"));

        let err = authorize(&validator, &token, &Role::BANK_ISSUER, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            AuthError::RoleMismatch {
                required: "BANK_ISSUER".to_string()
            }
        );
        assert!(!is_authorized(&validator, &token, &Role::BANK_ISSUER, Utc::now()));
    }

    #[test]
    fn empty_credential_is_missing() {
        let validator = Hs256JwtValidator::new(SECRET);
        assert_eq!(
            authorize(&validator, "  ", &Role::BANK_ISSUER, Utc::now()),
            Err(AuthError::MissingCredential)
        );
    }
}
