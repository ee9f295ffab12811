//! Compiled ACLs: building, rule indexing, and capability reporting.
//!
//! An [`Acl`] is the query-optimized form of a policy set. It is immutable
//! once built and holds no interior locks; hot-swapping after a policy
//! change is the caller's concern (an atomic swap of the whole value).

mod eval;
mod trie;

pub use eval::{Decision, Request};

use std::collections::HashMap;

use tracing::{Level, debug, instrument};

use crate::capability::CapabilitySet;
use crate::error::AclError;
use crate::permissions::{Merge, Permissions};
use crate::policy::Policy;
use trie::PathTrie;

/// Reserved policy name that unconditionally grants root privileges.
const ROOT_POLICY: &str = "root";

/// A rule as stored in the compiled indexes.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledRule {
    pub capabilities: CapabilitySet,
    pub permissions: Permissions,
}

impl Merge for CompiledRule {
    fn merge(&self, other: &Self) -> Self {
        CompiledRule {
            capabilities: (self.capabilities | other.capabilities).normalized(),
            permissions: self.permissions.merge(&other.permissions),
        }
    }
}

/// The compiled, query-optimized form of a policy set.
#[derive(Debug, Clone, Default)]
pub struct Acl {
    /// Literal paths (no trailing glob in the source pattern).
    exact_rules: HashMap<String, CompiledRule>,
    /// Stripped prefixes, selected by longest match.
    prefix_rules: PathTrie<CompiledRule>,
    /// Set when the policy set contains the `root` policy.
    root: bool,
}

impl Acl {
    /// Compile a list of policies into an ACL.
    ///
    /// Rules are indexed in list order; rules resolving to the same path key
    /// merge (capability union with deny absorption, parameter-map union
    /// with wildcard absorption). A policy named `root` short-circuits to a
    /// root ACL with no rules.
    #[instrument(level = Level::DEBUG, skip(policies), fields(policies = policies.len()))]
    pub fn from_policies(policies: &[Policy]) -> Result<Self, AclError> {
        if policies.iter().any(|p| p.name == ROOT_POLICY) {
            debug!("policy set contains the root policy");
            return Ok(Acl {
                root: true,
                ..Default::default()
            });
        }

        let mut acl = Acl::default();
        for policy in policies {
            for rule in &policy.rules {
                if rule.pattern.is_empty() && !rule.is_prefix {
                    return Err(AclError::InvalidRule {
                        policy: policy.name.clone(),
                        message: "empty path pattern".into(),
                    });
                }
                let compiled = CompiledRule {
                    capabilities: rule.capability_set(),
                    permissions: rule.permissions.clone(),
                };
                if rule.is_prefix {
                    let merged = match acl.prefix_rules.get(&rule.pattern) {
                        Some(existing) => existing.merge(&compiled),
                        None => compiled,
                    };
                    acl.prefix_rules.insert(&rule.pattern, merged);
                } else {
                    match acl.exact_rules.get_mut(&rule.pattern) {
                        Some(existing) => *existing = existing.merge(&compiled),
                        None => {
                            acl.exact_rules.insert(rule.pattern.clone(), compiled);
                        }
                    }
                }
            }
        }
        debug!(
            exact = acl.exact_rules.len(),
            prefix = acl.prefix_rules.len(),
            "compiled ACL"
        );
        Ok(acl)
    }

    /// Whether this ACL was built from a policy set containing `root`.
    pub fn is_root(&self) -> bool {
        self.root
    }

    /// The rule governing `path`: an exact match outranks any prefix match;
    /// among prefixes the longest stored key wins.
    pub(crate) fn select_rule(&self, path: &str) -> Option<&CompiledRule> {
        self.exact_rules
            .get(path)
            .or_else(|| self.prefix_rules.longest_prefix(path))
    }

    /// Human-readable capabilities for the rule that would govern `path`.
    ///
    /// Returns `["root"]` for a root ACL, and `["deny"]` when no rule
    /// matches or the governing rule is deny-only.
    pub fn capabilities(&self, path: &str) -> Vec<&'static str> {
        if self.root {
            return vec!["root"];
        }
        match self.select_rule(path) {
            Some(rule) => rule.capabilities.names(),
            None => vec!["deny"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(source: &str) -> Policy {
        Policy::parse(source).expect("test policy parses")
    }

    const DEV_POLICY: &str = r#"
name = "dev"
path "dev/*" {
    policy = "sudo"
}
path "stage/*" {
    policy = "write"
}
path "stage/aws/*" {
    policy = "read"
    capabilities = ["update", "sudo"]
}
path "stage/aws/policy/*" {
    policy = "sudo"
}
path "prod/*" {
    policy = "read"
}
path "prod/aws/*" {
    policy = "deny"
}
path "sys/*" {
    policy = "deny"
}
path "foo/bar" {
    capabilities = ["read", "create", "sudo"]
}
"#;

    #[test]
    fn root_policy_short_circuits() {
        let root = Policy {
            name: "root".into(),
            rules: Vec::new(),
        };
        let acl = Acl::from_policies(&[root]).unwrap();
        assert!(acl.is_root());
        assert_eq!(acl.capabilities("any/path"), vec!["root"]);
        assert_eq!(acl.capabilities("sys/seal"), vec!["root"]);
    }

    #[test]
    fn capabilities_reporting() {
        let acl = Acl::from_policies(&[parse(DEV_POLICY)]).unwrap();

        // "dev" does not match the "dev/" prefix.
        assert_eq!(acl.capabilities("dev"), vec!["deny"]);
        assert_eq!(
            acl.capabilities("dev/"),
            vec!["sudo", "read", "list", "update", "delete", "create"]
        );
        assert_eq!(
            acl.capabilities("stage/aws/test"),
            vec!["sudo", "read", "list", "update"]
        );
        assert_eq!(acl.capabilities("sys/status"), vec!["deny"]);
        assert_eq!(acl.capabilities("foo/bar"), vec!["sudo", "read", "create"]);
    }

    #[test]
    fn empty_pattern_is_invalid() {
        let policy = parse(r#"path "" { policy = "read" }"#);
        let err = Acl::from_policies(&[policy]).unwrap_err();
        assert!(matches!(err, AclError::InvalidRule { .. }));
    }

    #[test]
    fn bare_star_is_a_valid_root_prefix() {
        let policy = parse(r#"name = "base" path "*" { policy = "read" }"#);
        let acl = Acl::from_policies(&[policy]).unwrap();
        assert_eq!(acl.capabilities("anything/at/all"), vec!["read", "list"]);
    }

    #[test]
    fn deny_absorbs_merged_capabilities() {
        let base = parse(r#"path "foo/bar" { capabilities = ["read", "create", "sudo"] }"#);
        let layered = parse(r#"path "foo/bar" { capabilities = ["deny"] }"#);
        let acl = Acl::from_policies(&[base, layered]).unwrap();
        assert_eq!(acl.capabilities("foo/bar"), vec!["deny"]);
    }

    #[test]
    fn same_path_rules_merge_parameter_maps() {
        let policy = parse(
            r#"
name = "ops"
path "foo/bar" {
    policy = "write"
    permissions = {
        denied_parameters = {
            "baz" = []
        }
    }
}
path "foo/bar" {
    policy = "write"
    permissions = {
        denied_parameters = {
            "zip" = []
        }
    }
}
path "allow/all" {
    policy = "write"
    permissions = {
        allowed_parameters = {
            "test" = []
        }
    }
}
path "allow/all" {
    policy = "write"
    permissions = {
        allowed_parameters = {
            "*" = []
        }
    }
}
path "allow/all1" {
    policy = "write"
    permissions = {
        allowed_parameters = {
            "*" = []
        }
    }
}
path "allow/all1" {
    policy = "write"
    permissions = {
        allowed_parameters = {
            "test" = []
        }
    }
}
path "deny/all" {
    policy = "write"
    permissions = {
        denied_parameters = {
            "frank" = []
        }
    }
}
path "deny/all" {
    policy = "write"
    permissions = {
        denied_parameters = {
            "*" = []
        }
    }
}
path "value/merge" {
    policy = "write"
    permissions = {
        allowed_parameters = {
            "test" = [1, 2]
        }
        denied_parameters = {
            "test" = [1, 2]
        }
    }
}
path "value/merge" {
    policy = "write"
    permissions = {
        allowed_parameters = {
            "test" = [3, 4]
        }
        denied_parameters = {
            "test" = [3, 4]
        }
    }
}
"#,
        );
        let acl = Acl::from_policies(&[policy]).unwrap();

        let foo = &acl.exact_rules["foo/bar"].permissions;
        assert!(foo.allowed_parameters.is_empty());
        assert!(foo.denied_parameters["baz"].is_empty());
        assert!(foo.denied_parameters["zip"].is_empty());

        for path in ["allow/all", "allow/all1"] {
            let perms = &acl.exact_rules[path].permissions;
            assert_eq!(perms.allowed_parameters.len(), 1);
            assert!(perms.allowed_parameters["*"].is_empty());
        }

        let deny = &acl.exact_rules["deny/all"].permissions;
        assert_eq!(deny.denied_parameters.len(), 1);
        assert!(deny.denied_parameters["*"].is_empty());

        let merged = &acl.exact_rules["value/merge"].permissions;
        let expected = vec![json!(1), json!(2), json!(3), json!(4)];
        assert_eq!(merged.allowed_parameters["test"], expected);
        assert_eq!(merged.denied_parameters["test"], expected);
    }

    #[test]
    fn prefix_and_exact_rules_index_separately() {
        let policy = parse(
            r#"
path "auth/token/create*" {
    capabilities = ["update", "create", "sudo"]
}
path "auth/token/create" {
    capabilities = ["read"]
}
"#,
        );
        let acl = Acl::from_policies(&[policy]).unwrap();
        assert!(acl.exact_rules.contains_key("auth/token/create"));
        assert_eq!(acl.prefix_rules.len(), 1);
        // The exact rule outranks the prefix rule for its own path.
        assert_eq!(acl.capabilities("auth/token/create"), vec!["read"]);
        assert_eq!(
            acl.capabilities("auth/token/create-orphan"),
            vec!["sudo", "update", "create"]
        );
    }
}
