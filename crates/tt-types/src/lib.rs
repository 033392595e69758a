//! ThingTalk's type system.
//!
//! - `types` — the `Type` enum: ground types, parametric types (`Array`,
//!   `Measure`, `Entity`, `Enum`, `Compound`), and the two internal-only
//!   variants (`TypeVar`, `Unknown`) that must not survive typechecking.
//! - `scope` — the mutable type scope threaded through assignability
//!   checks, binding type-variable names to concrete types.
//! - `assignability` — the `A ⊑ B` relation.
//! - `inheritance` — the entity subtype table (`e1 <: e2`).
//! - `overload` — operator overload tables and resolution.

pub mod assignability;
pub mod inheritance;
pub mod overload;
pub mod scope;
pub mod types;

pub use assignability::is_assignable;
pub use inheritance::EntityInheritance;
pub use overload::{OverloadError, OverloadTable, Signature};
pub use scope::TypeScope;
pub use types::Type;
