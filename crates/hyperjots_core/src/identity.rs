//! Caller identity resolution.
//!
//! # Responsibility
//! - Produce the opaque identity string of the current caller.
//! - Keep authentication concerns outside the note store.
//!
//! # Invariants
//! - Resolution is side-effect free.
//! - Returned identities are never trimmed, parsed or case-folded.
//! - Empty or whitespace-only identities are reported as unavailable.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default environment variable read by `EnvIdentity`.
pub const DEFAULT_IDENTITY_ENV_VAR: &str = "HYPERJOTS_IDENTITY";

/// Identity resolution failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// The execution context carries no caller identity.
    Missing,
    /// The execution context carries an empty identity.
    Empty,
    /// The identity source could not be read.
    Unreadable(String),
}

impl Display for IdentityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "no caller identity in execution context"),
            Self::Empty => write!(f, "caller identity is empty"),
            Self::Unreadable(details) => write!(f, "caller identity unreadable: {details}"),
        }
    }
}

impl Error for IdentityError {}

/// Resolves the identity of the caller on whose behalf an operation runs.
pub trait IdentityResolver {
    /// Returns the caller identity as an opaque, case-sensitive token.
    fn resolve(&self) -> Result<String, IdentityError>;
}

impl<T: IdentityResolver + ?Sized> IdentityResolver for &T {
    fn resolve(&self) -> Result<String, IdentityError> {
        (**self).resolve()
    }
}

/// Identity bound once, for handles that serve a single logical caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticIdentity {
    identity: Option<String>,
}

impl StaticIdentity {
    /// Binds the handle to `identity`.
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: Some(identity.into()),
        }
    }

    /// Handle with no caller attached; every resolution fails.
    pub fn anonymous() -> Self {
        Self { identity: None }
    }
}

impl IdentityResolver for StaticIdentity {
    fn resolve(&self) -> Result<String, IdentityError> {
        match self.identity.as_deref() {
            Some(value) => checked_identity(value),
            None => Err(IdentityError::Missing),
        }
    }
}

/// Identity read from an environment variable on every call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvIdentity {
    var: String,
}

impl EnvIdentity {
    /// Reads identity from `var`.
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_IDENTITY_ENV_VAR)
    }
}

impl IdentityResolver for EnvIdentity {
    fn resolve(&self) -> Result<String, IdentityError> {
        match std::env::var(&self.var) {
            Ok(value) => checked_identity(&value),
            Err(std::env::VarError::NotPresent) => Err(IdentityError::Missing),
            Err(err) => Err(IdentityError::Unreadable(format!("{}: {err}", self.var))),
        }
    }
}

fn checked_identity(value: &str) -> Result<String, IdentityError> {
    if value.trim().is_empty() {
        return Err(IdentityError::Empty);
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::{EnvIdentity, IdentityError, IdentityResolver, StaticIdentity};

    #[test]
    fn static_identity_is_returned_verbatim() {
        let resolver = StaticIdentity::new(" x509::CN=User1@org1 ");
        assert_eq!(resolver.resolve().unwrap(), " x509::CN=User1@org1 ");
    }

    #[test]
    fn anonymous_and_blank_identities_are_unavailable() {
        assert_eq!(
            StaticIdentity::anonymous().resolve(),
            Err(IdentityError::Missing)
        );
        assert_eq!(
            StaticIdentity::new("   ").resolve(),
            Err(IdentityError::Empty)
        );
    }

    #[test]
    fn env_identity_reports_missing_variable() {
        let resolver = EnvIdentity::new("HYPERJOTS_IDENTITY_TEST_UNSET_VARIABLE");
        assert_eq!(resolver.resolve(), Err(IdentityError::Missing));
    }

    #[test]
    fn env_identity_reads_variable() {
        std::env::set_var("HYPERJOTS_IDENTITY_TEST_SET_VARIABLE", "org2-user");
        let resolver = EnvIdentity::new("HYPERJOTS_IDENTITY_TEST_SET_VARIABLE");
        assert_eq!(resolver.resolve().unwrap(), "org2-user");
    }
}
