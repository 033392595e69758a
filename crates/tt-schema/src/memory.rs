//! The memory-table client.

use tt_common::diagnostics::Result;
use tt_types::Type;

/// The column shape of a previously-saved result table, as returned by a
/// `MemoryClient` (used when typechecking a `VarRef` against a table
/// that was saved by an earlier `let` rather than declared inline).
#[derive(Clone, Debug, PartialEq)]
pub struct MemorySchema {
    pub args: Vec<String>,
    pub types: Vec<Type>,
}

pub trait MemoryClient {
    /// `None` when `table` names no saved memory table.
    fn get_schema(&mut self, table: &str) -> Result<Option<MemorySchema>>;
}
