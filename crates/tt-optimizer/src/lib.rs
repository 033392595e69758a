//! The idempotent algebraic optimizer: a terminating
//! in-place rewriter over a typechecked AST. Every rewrite strictly
//! reduces node count or normalizes a commutative connective, so a single
//! pass to a fixed point (bounded by
//! [`tt_common::limits::MAX_OPTIMIZER_PASSES`] as a backstop) suffices.

mod boolean;
mod program;
mod stream;
mod table;

pub use boolean::optimize_boolean;
pub use program::optimize_program;
pub use stream::optimize_stream;
pub use table::optimize_table;
