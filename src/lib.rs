//! # Strongbox ACL
//!
//! The path-based ACL compiler and evaluator of the Strongbox secrets
//! server.
//!
//! ## Overview
//!
//! Authorization is expressed as named policies. A policy is a text
//! document holding `path` rules; each rule grants a set of capabilities on
//! a literal path or a path prefix (trailing `*`), optionally constrained by
//! parameter allow/deny lists:
//!
//! ```text
//! name = "dev"
//! path "secret/dev/*" {
//!     policy = "write"
//! }
//! path "sys/seal" {
//!     capabilities = ["update", "sudo"]
//!     permissions = {
//!         denied_parameters = {
//!             "force" = []
//!         }
//!     }
//! }
//! ```
//!
//! One or more policies compile into an [`Acl`]: an exact-path table plus a
//! longest-prefix index, with rules for the same path merged (capability
//! union with deny absorption, parameter-map union with wildcard
//! absorption). The evaluator answers, per request, whether the operation
//! is allowed and whether it carries root-equivalent privileges.
//!
//! This crate provides:
//! - Policy document parsing with positioned errors
//! - The capability model and the `deny`/`read`/`write`/`sudo` shorthands
//! - ACL compilation with the layered-policy merge algebra
//! - A total, read-only request evaluator safe for concurrent use
//!
//! ## Quick Start
//!
//! ```rust
//! use strongbox_acl::{Acl, Operation, Policy, Request};
//!
//! let policy = Policy::parse(r#"
//! name = "dev"
//! path "secret/dev/*" {
//!     policy = "write"
//! }
//! "#)?;
//!
//! let acl = Acl::from_policies(&[policy])?;
//!
//! let decision = acl.allow_operation(&Request::new(Operation::Read, "secret/dev/api-key"));
//! assert!(decision.allowed);
//! assert!(!decision.root_privs);
//!
//! assert_eq!(acl.capabilities("secret/dev/api-key"),
//!            vec!["read", "list", "update", "delete", "create"]);
//! assert_eq!(acl.capabilities("secret/prod/db"), vec!["deny"]);
//! # Ok::<(), strongbox_acl::AclError>(())
//! ```
//!
//! ## Concurrency
//!
//! An [`Acl`] is immutable after construction and holds no locks; it may be
//! queried by any number of concurrent requests. Replacing the ACL after a
//! policy change is the caller's responsibility, modeled as an atomic swap
//! of the whole value.

pub mod acl;
pub mod capability;
pub mod error;
pub mod loader;
pub mod permissions;
pub mod policy;

pub use acl::{Acl, Decision, Request};
pub use capability::{Capability, CapabilitySet, Operation, PolicyKind};
pub use error::{AclError, ParseError, Result};
pub use loader::{load_policy_dir, load_policy_file};
pub use permissions::{Merge, Permissions};
pub use policy::{PathRule, Policy};
