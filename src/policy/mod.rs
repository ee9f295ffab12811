//! Policy documents: a name plus a list of path rules.

pub mod parse;

use serde::{Deserialize, Serialize};
use tracing::{Level, instrument};

use crate::capability::{Capability, CapabilitySet, PolicyKind};
use crate::error::ParseError;
use crate::permissions::Permissions;

/// A named set of path rules, as parsed from a policy document.
///
/// Policies are immutable once parsed; the [`crate::Acl`] builder consumes
/// them by reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy name. The name `"root"` is reserved and grants everything.
    #[serde(default)]
    pub name: String,

    /// Path rules in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<PathRule>,
}

impl Policy {
    /// Parse a policy document.
    ///
    /// # Example
    ///
    /// ```rust
    /// use strongbox_acl::Policy;
    ///
    /// let policy = Policy::parse(r#"
    /// name = "dev"
    /// path "secret/dev/*" {
    ///     policy = "write"
    /// }
    /// "#)?;
    /// assert_eq!(policy.name, "dev");
    /// assert_eq!(policy.rules.len(), 1);
    /// # Ok::<(), strongbox_acl::ParseError>(())
    /// ```
    #[instrument(level = Level::DEBUG, skip(source))]
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        parse::parse(source)
    }
}

/// A single `path "<pattern>" { … }` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathRule {
    /// The pattern text, with any trailing `*` stripped.
    pub pattern: String,

    /// True when the original pattern ended in `*`.
    #[serde(default)]
    pub is_prefix: bool,

    /// Shorthand policy kind, if the block declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyKind>,

    /// Explicitly listed capabilities.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capabilities: Vec<Capability>,

    /// Parameter constraints attached to the rule.
    #[serde(default, skip_serializing_if = "Permissions::is_empty")]
    pub permissions: Permissions,
}

impl PathRule {
    /// The rule's effective capability set: the shorthand expansion unioned
    /// with the explicit list, with deny absorbing everything else.
    pub fn capability_set(&self) -> CapabilitySet {
        let mut caps = self
            .policy
            .map(PolicyKind::capabilities)
            .unwrap_or_default();
        for capability in &self.capabilities {
            caps |= capability.flag();
        }
        caps.normalized()
    }
}
