//! Capabilities, request operations, and the `policy` shorthand kinds.
//!
//! A rule's capability set is carried both as parsed [`Capability`] values and
//! as a [`CapabilitySet`] bitmask; the evaluator only ever consults the
//! bitmask.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitmask form of a rule's capability set, for cheap membership tests.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CapabilitySet: u8 {
        const DENY   = 1 << 0;
        const READ   = 1 << 1;
        const LIST   = 1 << 2;
        const CREATE = 1 << 3;
        const UPDATE = 1 << 4;
        const DELETE = 1 << 5;
        const SUDO   = 1 << 6;
    }
}

impl Default for CapabilitySet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Capability names in the order the server reports them.
const REPORT_ORDER: [(CapabilitySet, &str); 6] = [
    (CapabilitySet::SUDO, "sudo"),
    (CapabilitySet::READ, "read"),
    (CapabilitySet::LIST, "list"),
    (CapabilitySet::UPDATE, "update"),
    (CapabilitySet::DELETE, "delete"),
    (CapabilitySet::CREATE, "create"),
];

impl CapabilitySet {
    /// Apply deny absorption: a set containing `deny` collapses to `{deny}`.
    pub fn normalized(self) -> Self {
        if self.contains(Self::DENY) {
            Self::DENY
        } else {
            self
        }
    }

    /// Human-readable capability names. An empty or deny-carrying set reports
    /// as `["deny"]`.
    pub fn names(self) -> Vec<&'static str> {
        if self.is_empty() || self.contains(Self::DENY) {
            return vec!["deny"];
        }
        REPORT_ORDER
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|&(_, name)| name)
            .collect()
    }
}

/// A single permitted action on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Deny,
    Read,
    List,
    Create,
    Update,
    Delete,
    Sudo,
}

impl Capability {
    /// Look up a capability by its document spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "deny" => Some(Capability::Deny),
            "read" => Some(Capability::Read),
            "list" => Some(Capability::List),
            "create" => Some(Capability::Create),
            "update" => Some(Capability::Update),
            "delete" => Some(Capability::Delete),
            "sudo" => Some(Capability::Sudo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Deny => "deny",
            Capability::Read => "read",
            Capability::List => "list",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Sudo => "sudo",
        }
    }

    /// The bitmask flag for this capability.
    pub fn flag(self) -> CapabilitySet {
        match self {
            Capability::Deny => CapabilitySet::DENY,
            Capability::Read => CapabilitySet::READ,
            Capability::List => CapabilitySet::LIST,
            Capability::Create => CapabilitySet::CREATE,
            Capability::Update => CapabilitySet::UPDATE,
            Capability::Delete => CapabilitySet::DELETE,
            Capability::Sudo => CapabilitySet::SUDO,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shorthand declared via `policy = "…"` that expands to a capability set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Deny,
    Read,
    Write,
    Sudo,
}

impl PolicyKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "deny" => Some(PolicyKind::Deny),
            "read" => Some(PolicyKind::Read),
            "write" => Some(PolicyKind::Write),
            "sudo" => Some(PolicyKind::Sudo),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PolicyKind::Deny => "deny",
            PolicyKind::Read => "read",
            PolicyKind::Write => "write",
            PolicyKind::Sudo => "sudo",
        }
    }

    /// The capability set this shorthand expands to.
    pub fn capabilities(self) -> CapabilitySet {
        match self {
            PolicyKind::Deny => CapabilitySet::DENY,
            PolicyKind::Read => CapabilitySet::READ | CapabilitySet::LIST,
            PolicyKind::Write => {
                CapabilitySet::READ
                    | CapabilitySet::LIST
                    | CapabilitySet::CREATE
                    | CapabilitySet::UPDATE
                    | CapabilitySet::DELETE
            }
            PolicyKind::Sudo => PolicyKind::Write.capabilities() | CapabilitySet::SUDO,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of an incoming request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    List,
    Create,
    Update,
    Delete,
    Help,
    Revoke,
    Renew,
    Rollback,
}

impl Operation {
    /// The capability a rule must carry for this operation.
    ///
    /// `Help` requires none. Lease and storage maintenance operations
    /// (`Revoke`, `Renew`, `Rollback`) require `update`.
    pub fn required_capability(self) -> Option<CapabilitySet> {
        match self {
            Operation::Read => Some(CapabilitySet::READ),
            Operation::List => Some(CapabilitySet::LIST),
            Operation::Create => Some(CapabilitySet::CREATE),
            Operation::Delete => Some(CapabilitySet::DELETE),
            Operation::Update | Operation::Revoke | Operation::Renew | Operation::Rollback => {
                Some(CapabilitySet::UPDATE)
            }
            Operation::Help => None,
        }
    }
}
