//! Source locations for diagnostics.
//!
//! ThingTalk's grammar is out of scope for this workspace:
//! the parser is a black box that hands us an already-built AST. We still
//! want diagnostics to point somewhere useful, so every AST node that can
//! fail typechecking carries an optional `Location` it was parsed from.
//! When the caller's parser doesn't populate locations, `Location::UNKNOWN`
//! degrades gracefully to a location-less diagnostic.

use serde::{Deserialize, Serialize};

/// A 1-indexed line/column location in a named source unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub const UNKNOWN: Location = Location { line: 0, column: 0 };

    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }

    #[must_use]
    pub const fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_known() {
            write!(f, "{}:{}", self.line, self.column)
        } else {
            write!(f, "<unknown>")
        }
    }
}
