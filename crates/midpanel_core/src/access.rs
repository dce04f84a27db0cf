//! Actors, roles, and the capability set gating mutations.
//!
//! Permissions are resolved once, when the actor is constructed, into a
//! typed [`Capabilities`] value. Everything downstream checks booleans on
//! that value; nothing re-parses role names at call sites.

use crate::id::ResellerId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The reseller scope an operation runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Operate on every reseller's rows. Requires admin capability.
    AllResellers,
    /// Operate on a single reseller's rows.
    Reseller(ResellerId),
}

impl Scope {
    /// Returns the reseller this scope is limited to, if any.
    #[must_use]
    pub fn reseller(&self) -> Option<ResellerId> {
        match self {
            Scope::AllResellers => None,
            Scope::Reseller(id) => Some(*id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::AllResellers => f.write_str("all-resellers"),
            Scope::Reseller(id) => write!(f, "{id}"),
        }
    }
}

/// Coarse role assigned to a panel user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access across all resellers.
    SuperAdmin,
    /// Full access within the actor's own reseller.
    ResellerAdmin,
    /// Read-only access within the actor's own reseller.
    Observer,
}

impl Role {
    /// Expands the role into its capability set.
    #[must_use]
    pub fn capabilities(self) -> Capabilities {
        match self {
            Role::SuperAdmin => Capabilities {
                all_resellers: true,
                write_accounts: true,
                write_ledger: true,
            },
            Role::ResellerAdmin => Capabilities {
                all_resellers: false,
                write_accounts: true,
                write_ledger: true,
            },
            Role::Observer => Capabilities {
                all_resellers: false,
                write_accounts: false,
                write_ledger: false,
            },
        }
    }
}

/// What an actor is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// May operate across all resellers (admin scope).
    pub all_resellers: bool,
    /// May create, update, or delete subscriber accounts.
    pub write_accounts: bool,
    /// May record, correct, or void ledger entries and payments.
    pub write_ledger: bool,
}

impl Capabilities {
    /// Capability set with nothing granted.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            all_resellers: false,
            write_accounts: false,
            write_ledger: false,
        }
    }
}

/// A resolved panel user: identity plus capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Display label used in audit fields (operator login name).
    pub label: String,
    /// The reseller this actor belongs to. `None` for global admins.
    pub reseller: Option<ResellerId>,
    /// Resolved capability set.
    pub capabilities: Capabilities,
}

impl Actor {
    /// Builds an actor from a role.
    pub fn new(label: impl Into<String>, reseller: Option<ResellerId>, role: Role) -> Self {
        Self {
            label: label.into(),
            reseller,
            capabilities: role.capabilities(),
        }
    }

    /// Resolves the scope this actor may run an operation under.
    ///
    /// Admins get the requested scope, defaulting to [`Scope::AllResellers`].
    /// Everyone else is pinned to their own reseller; a request for another
    /// reseller (or for the global scope) yields `None`.
    #[must_use]
    pub fn resolve_scope(&self, requested: Option<ResellerId>) -> Option<Scope> {
        if self.capabilities.all_resellers {
            return Some(match requested {
                Some(id) => Scope::Reseller(id),
                None => Scope::AllResellers,
            });
        }

        let own = self.reseller?;
        match requested {
            Some(id) if id != own => None,
            _ => Some(Scope::Reseller(own)),
        }
    }
}
