use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried in the token's `role` claim.
///
/// Roles are opaque strings at this layer. The ledger only ever grants
/// [`Role::BANK_ISSUER`]; other values may appear on foreign tokens and are
/// simply never authorized for mutating endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    /// Privileged role required for every ledger/account mutation.
    pub const BANK_ISSUER: Role = Role(Cow::Borrowed("BANK_ISSUER"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
