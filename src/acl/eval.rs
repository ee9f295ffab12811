//! Request evaluation against a compiled ACL.
//!
//! Evaluation is total: every denial is expressed through
//! [`Decision::allowed`] being false, never through an error. The evaluator
//! holds no mutable state and is safely shareable across concurrent
//! requests.

use std::collections::HashMap;

use serde_json::Value;
use tracing::trace;

use super::Acl;
use crate::capability::{CapabilitySet, Operation};
use crate::permissions::{Permissions, WILDCARD};

/// A normalized incoming request, as handed over by the request router.
#[derive(Debug, Clone)]
pub struct Request {
    pub operation: Operation,
    pub path: String,
    /// The request's parameter bag.
    pub data: HashMap<String, Value>,
}

impl Request {
    pub fn new(operation: Operation, path: impl Into<String>) -> Self {
        Request {
            operation,
            path: path.into(),
            data: HashMap::new(),
        }
    }

    /// Attach a parameter bag.
    pub fn with_data(mut self, data: HashMap<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// The outcome of an authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the operation is permitted.
    pub allowed: bool,
    /// Whether the governing rule carries root-equivalent privileges.
    pub root_privs: bool,
}

impl Decision {
    const DENY: Decision = Decision {
        allowed: false,
        root_privs: false,
    };
}

impl Acl {
    /// Decide whether `request` is permitted and whether it carries
    /// root-equivalent privileges.
    ///
    /// Selection order: root short-circuit, `Help` short-circuit, exact
    /// rule, longest matching prefix rule. The capability check reports
    /// `root_privs` even when the operation itself is refused.
    pub fn allow_operation(&self, request: &Request) -> Decision {
        if self.is_root() {
            trace!(path = %request.path, "root ACL");
            return Decision {
                allowed: true,
                root_privs: true,
            };
        }

        // Help is informational and requires no capability anywhere.
        if request.operation == Operation::Help {
            return Decision {
                allowed: true,
                root_privs: false,
            };
        }

        let Some(rule) = self.select_rule(&request.path) else {
            trace!(path = %request.path, "no matching rule");
            return Decision::DENY;
        };

        let caps = rule.capabilities;
        debug_assert!(
            caps == caps.normalized(),
            "stored capability sets are deny-normalized"
        );
        if caps.contains(CapabilitySet::DENY) {
            return Decision::DENY;
        }

        let root_privs = caps.contains(CapabilitySet::SUDO);
        if let Some(required) = request.operation.required_capability()
            && !caps.contains(required)
        {
            trace!(path = %request.path, operation = ?request.operation, "capability missing");
            return Decision {
                allowed: false,
                root_privs,
            };
        }

        if !check_parameters(&rule.permissions, &request.data) {
            trace!(path = %request.path, "parameter constraint violated");
            return Decision {
                allowed: false,
                root_privs,
            };
        }

        Decision {
            allowed: true,
            root_privs,
        }
    }
}

/// Enforce a rule's parameter constraints against the request data.
///
/// Parameter names are matched case-insensitively. A name with a non-empty
/// deny list that does not match the value is cleared outright; the allow
/// side is not consulted for it.
fn check_parameters(permissions: &Permissions, data: &HashMap<String, Value>) -> bool {
    let allowed = &permissions.allowed_parameters;
    let denied = &permissions.denied_parameters;
    if allowed.is_empty() && denied.is_empty() {
        return true;
    }

    for (name, value) in data {
        let name = name.to_lowercase();

        if let Some(listed) = denied.get(&name) {
            if listed.is_empty() || listed.contains(value) {
                return false;
            }
            continue;
        }
        if let Some(listed) = denied.get(WILDCARD)
            && (listed.is_empty() || listed.contains(value))
        {
            return false;
        }

        if !allowed.is_empty() {
            match allowed.get(&name).or_else(|| allowed.get(WILDCARD)) {
                None => return false,
                Some(listed) if !listed.is_empty() && !listed.contains(value) => return false,
                Some(_) => {}
            }
        }
    }
    true
}
