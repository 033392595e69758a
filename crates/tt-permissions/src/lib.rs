//! The SMT-backed permission checker.
//!
//! `PermissionChecker` drives `tt-smt`'s `Encoder` and a pluggable
//! `SolverClient` together with domain rules the encoder itself knows
//! nothing about — which policies apply to which invocation, how a
//! partially-bound rule gets partially evaluated against a policy's
//! precondition/postcondition. The encoder stays a pure algebra engine;
//! this crate is the consumer that gives it meaning.
//!
//! `PreconditionFalseError` never needs to surface here: the
//! "impossible rule" and "no policy admits this rule" cases are both
//! modeled as ordinary `RuleOutcome::Deleted` results from SAT queries,
//! not as a propagated error.

pub mod checker;
pub mod condition;
pub mod index;
pub mod oracle;

pub use checker::{PermissionChecker, SolverFactory};
pub use condition::{known_bindings, partial_eval, permission_condition, postcondition, precondition, rule_filter};
pub use index::{
    applicable_rules, applicable_rules_indexed, collect_program_contacts, collect_rule_contacts,
    index_by_kind_channel,
};
pub use oracle::{CachedOracle, GroupOracle};
