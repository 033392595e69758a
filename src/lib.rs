//! The ThingTalk façade: the entry points a caller outside
//! this workspace drives the whole pipeline through — `parse`,
//! `parse_and_typecheck`, `permission_check`.
//!
//! `parse` has no concrete grammar behind it here: the surface syntax
//! (the ThingTalk DSL text, and the legacy "SEMPRE" JSON form) is
//! explicitly out of scope. [`Parser`] is the pluggable
//! boundary a caller supplies instead, the same shape `tt_schema::SchemaClient`
//! uses for the catalogue wire format it also doesn't own.

pub use tt_ast as ast;
pub use tt_checker::{CheckerOptions, TypeChecker, BUILTIN_CLASS, CANONICAL_REMOTE_CLASS};
pub use tt_common::diagnostics::{Result, TypeCheckError};
pub use tt_lowering::{Lowering, LoweredProgram};
pub use tt_optimizer::{optimize_boolean, optimize_program, optimize_stream, optimize_table};
pub use tt_permissions::{GroupOracle, PermissionChecker, SolverFactory};
pub use tt_schema::{SchemaClient, SchemaRetriever};
pub use tt_smt::{CheckSatResult, Encoder, FakeSolver, SolverClient};
pub use tt_types::Type;

use tt_ast::{ClassDef, PermissionRule, Program};

/// What a parsed source can resolve to.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedUnit {
    Program(Program),
    PermissionRule(PermissionRule),
    Library(Vec<ClassDef>),
}

/// The out-of-scope grammar boundary. A caller supplies an implementation
/// backed by whatever surface form it reads; nothing in this workspace
/// parses DSL text or SEMPRE JSON.
pub trait Parser {
    fn parse(&mut self, source: &str) -> Result<ParsedUnit>;
}

/// `parse`. Delegates straight through to the caller's
/// `Parser` — there's no grammar of our own to run first.
pub fn parse(parser: &mut impl Parser, source: &str) -> Result<ParsedUnit> {
    parser.parse(source)
}

/// `parse_and_typecheck`: parse, then run the typechecker
/// over whichever unit came back, dispatching to the matching driver
/// method.
pub fn parse_and_typecheck(
    parser: &mut impl Parser,
    source: &str,
    retriever: &mut SchemaRetriever,
    client: &mut impl SchemaClient,
    options: CheckerOptions,
) -> Result<ParsedUnit> {
    let mut unit = parser.parse(source)?;
    let mut checker = TypeChecker::new(retriever, options);
    match &mut unit {
        ParsedUnit::Program(program) => checker.type_check_program(client, program)?,
        ParsedUnit::PermissionRule(rule) => checker.type_check_permission_rule(client, rule)?,
        ParsedUnit::Library(classes) => checker.type_check_library(client, classes)?,
    }
    Ok(unit)
}

/// `permission_check`: run the SMT-backed permission checker
/// over an already-typechecked program against `policies`, returning the
/// rewritten program or `None` if every rule got discarded.
pub fn permission_check(
    principal: &str,
    mut program: Program,
    policies: &[PermissionRule],
    factory: &mut impl SolverFactory,
    oracle: &mut impl GroupOracle,
) -> Result<Option<Program>> {
    let mut checker = PermissionChecker::new(factory, oracle);
    checker.check_program(principal, &mut program, policies)
}
