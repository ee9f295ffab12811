//! Parameter-level allow/deny constraints and their merge algebra.
//!
//! Each rule may constrain the request's parameter bag. An entry maps a
//! lowercase parameter name to a list of permitted (or forbidden) literal
//! values; an empty list means "any value". The literal name `*` is the
//! wildcard parameter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The wildcard parameter name.
pub const WILDCARD: &str = "*";

/// Parameter constraints attached to a rule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Permissions {
    /// Parameters a request may carry. Empty map = no allow-side constraint.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub allowed_parameters: HashMap<String, Vec<Value>>,

    /// Parameters a request must not carry (or carry with a listed value).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub denied_parameters: HashMap<String, Vec<Value>>,
}

impl Permissions {
    /// True when neither side constrains anything.
    pub fn is_empty(&self) -> bool {
        self.allowed_parameters.is_empty() && self.denied_parameters.is_empty()
    }
}

/// Types that merge with a later, layered counterpart.
pub trait Merge {
    /// Merges self with another value resolved for the same path key.
    fn merge(&self, other: &Self) -> Self;
}

impl Merge for Permissions {
    fn merge(&self, other: &Self) -> Self {
        Permissions {
            allowed_parameters: merge_parameter_maps(
                &self.allowed_parameters,
                &other.allowed_parameters,
            ),
            denied_parameters: merge_parameter_maps(
                &self.denied_parameters,
                &other.denied_parameters,
            ),
        }
    }
}

/// Union two parameter maps by key, concatenating value lists.
///
/// A bare wildcard entry (`"*" = []`) on either side absorbs the whole map:
/// the result constrains every parameter with any value.
fn merge_parameter_maps(
    base: &HashMap<String, Vec<Value>>,
    layered: &HashMap<String, Vec<Value>>,
) -> HashMap<String, Vec<Value>> {
    if has_bare_wildcard(base) || has_bare_wildcard(layered) {
        return HashMap::from([(WILDCARD.to_string(), Vec::new())]);
    }
    let mut merged = base.clone();
    for (name, values) in layered {
        merged
            .entry(name.clone())
            .or_default()
            .extend(values.iter().cloned());
    }
    merged
}

fn has_bare_wildcard(map: &HashMap<String, Vec<Value>>) -> bool {
    map.get(WILDCARD).is_some_and(Vec::is_empty)
}
