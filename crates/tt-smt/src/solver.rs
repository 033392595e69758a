//! The solver client trait.

use rustc_hash::FxHashMap;
use tt_common::diagnostics::{Result, TypeCheckError};

use crate::term::Term;

/// The result of `SolverClient::check_sat`: `sat;
/// assignment: name→bool; constants: name→string; unsat_core: set<name>`.
#[derive(Clone, Debug, PartialEq)]
pub enum CheckSatResult {
    Sat {
        /// Values of the free boolean names requested via
        /// `enable_assignments`.
        assignment: FxHashMap<String, bool>,
        /// Model values for non-boolean free constants, rendered as
        /// strings since their sort varies per query.
        constants: FxHashMap<String, String>,
    },
    Unsat {
        /// The names of the `AssertNamed` terms that participate in the
        /// unsat core.
        unsat_core: Vec<String>,
    },
}

impl CheckSatResult {
    #[must_use]
    pub fn is_sat(&self) -> bool {
        matches!(self, CheckSatResult::Sat { .. })
    }

    /// Whether `name` is in the unsat core, or `false` if this result is
    /// `Sat` (there's no core to belong to).
    #[must_use]
    pub fn core_contains(&self, name: &str) -> bool {
        match self {
            CheckSatResult::Unsat { unsat_core } => unsat_core.iter().any(|n| n == name),
            CheckSatResult::Sat { .. } => false,
        }
    }
}

/// A pluggable SMT solver handle.
///
/// Like `SchemaClient`, this is intentionally not `async`:
/// the single-threaded cooperative model suspends at the call site a
/// concrete implementation chooses, not inside this trait. `tt-permissions`
/// is the only crate that calls this directly; `tt-smt` just builds the
/// terms a call site asserts.
pub trait SolverClient {
    /// Declare or assert a raw top-level SMT-LIB command — used for
    /// sort/function declarations that must precede any `assert`.
    fn add(&mut self, term: &Term) -> Result<()>;

    /// Assert `term` as a hard constraint.
    fn assert(&mut self, term: &Term) -> Result<()>;

    /// Request that the next `check_sat` populate `CheckSatResult::Sat`'s
    /// `assignment` map with every declared boolean name's value, not just
    /// report satisfiability.
    fn enable_assignments(&mut self);

    /// Run the solver. A cooperative cancellation signal raised by the
    /// caller surfaces as `TypeCheckError::SolverCancelled`; any other communication failure
    /// surfaces as `TypeCheckError::Solver`.
    fn check_sat(&mut self) -> Result<CheckSatResult>;
}

/// An in-memory fake used by `tt-permissions`'s tests: not a real SMT
/// solver, just a fixed canned answer, the way `tt-schema`'s tests use a
/// `FakeClient` keyed by kind instead of a real network fetch.
#[derive(Default)]
pub struct FakeSolver {
    pub script: Vec<Term>,
    pub next_result: Option<CheckSatResult>,
    assignments_enabled: bool,
}

impl FakeSolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_result(result: CheckSatResult) -> Self {
        FakeSolver {
            script: Vec::new(),
            next_result: Some(result),
            assignments_enabled: false,
        }
    }
}

impl SolverClient for FakeSolver {
    fn add(&mut self, term: &Term) -> Result<()> {
        self.script.push(term.clone());
        Ok(())
    }

    fn assert(&mut self, term: &Term) -> Result<()> {
        self.script.push(term.clone());
        Ok(())
    }

    fn enable_assignments(&mut self) {
        self.assignments_enabled = true;
    }

    fn check_sat(&mut self) -> Result<CheckSatResult> {
        self.next_result.clone().ok_or_else(|| {
            TypeCheckError::Solver("FakeSolver has no canned result configured".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_solver_returns_configured_result() {
        let mut solver = FakeSolver::with_result(CheckSatResult::Unsat {
            unsat_core: vec!["constr_0".to_string()],
        });
        solver.assert(&Term::bool_lit(true)).unwrap();
        let result = solver.check_sat().unwrap();
        assert!(!result.is_sat());
        assert!(result.core_contains("constr_0"));
    }

    #[test]
    fn fake_solver_without_result_is_a_solver_error() {
        let mut solver = FakeSolver::new();
        assert!(matches!(
            solver.check_sat(),
            Err(TypeCheckError::Solver(_))
        ));
    }
}
