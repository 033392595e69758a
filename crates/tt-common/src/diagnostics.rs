//! Diagnostics and the top-level error taxonomy.

use crate::location::Location;
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
}

/// A single, located, human-readable diagnostic.
///
/// Unlike a full compiler's diagnostic list, the typechecker surfaces the
/// *first* error encountered rather than
/// accumulating a batch, so `Diagnostic` is usually carried inside
/// `TypeCheckError::Type` rather than collected into a `Vec`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(location: Location, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: DiagnosticSeverity::Error,
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// The error taxonomy every ThingTalk compiler stage reports through.
///
/// `PreconditionFalseError` is an internal signal: `tt-permissions` catches
/// it at the rule boundary and turns it into a rule deletion. It must never
/// be returned from a public entry point — see `tt-permissions`'s crate docs.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeCheckError {
    #[error("syntax error: {0}")]
    Syntax(Diagnostic),

    #[error("type error: {0}")]
    Type(Diagnostic),

    #[error("not implemented: {0}")]
    NotImplemented(Diagnostic),

    /// Internal signal only; see module docs. Never surfaced to a caller.
    #[error("precondition false")]
    PreconditionFalse,

    #[error("solver error: {0}")]
    Solver(String),

    #[error("solver cancelled")]
    SolverCancelled,
}

impl TypeCheckError {
    #[must_use]
    pub fn type_error(location: Location, message: impl Into<String>) -> Self {
        TypeCheckError::Type(Diagnostic::error(location, message))
    }

    #[must_use]
    pub fn not_implemented(location: Location, message: impl Into<String>) -> Self {
        TypeCheckError::NotImplemented(Diagnostic::error(location, message))
    }

    /// `CacheMiss` is not its own variant; once its negative-TTL window expires, the
    /// retriever surfaces it as a `TypeError("Invalid kind X")`.
    #[must_use]
    pub fn invalid_kind(location: Location, kind: &str) -> Self {
        TypeCheckError::type_error(location, format!("Invalid kind {kind}"))
    }
}

pub type Result<T> = std::result::Result<T, TypeCheckError>;
