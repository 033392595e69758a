//! SMT-LIB term building and AST encoding for ThingTalk permission
//! checking.
//!
//! This crate is the pure engine: it turns AST fragments into SMT-LIB
//! terms and owns the sort/name bookkeeping needed to do that
//! consistently across an encoding session. It has no opinion about what
//! the terms *mean* for a permission decision — that policy lives in
//! `tt-permissions`, which drives an `Encoder` and a `SolverClient`
//! together.

pub mod encoder;
pub mod solver;
pub mod sort;
pub mod term;

pub use encoder::{Encoder, EncodedInvocation, ParamEnv};
pub use solver::{CheckSatResult, FakeSolver, SolverClient};
pub use sort::{SortRegistry, GET_GROUPS_FN, LOCATION_SORT};
pub use term::{Command, Script, Term};
