//! `bankledger-auth`: identity gate for the ledger (role-scoped bearer tokens).
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod issuer;
pub mod principal;
pub mod roles;
pub mod token;

pub use authorize::{AuthError, authorize, is_authorized};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use issuer::IssuerGate;
pub use principal::PrincipalId;
pub use roles::Role;
pub use token::{Hs256JwtValidator, Hs256TokenMinter, JwtValidator, TokenMinter};
