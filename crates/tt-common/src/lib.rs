//! Common types and utilities shared across the ThingTalk compiler crates.
//!
//! This crate provides the foundations every other `tt-*` crate builds on:
//! - Diagnostics and the top-level error enum (`diagnostics`)
//! - Source locations for error reporting (`location`)
//! - A TTL-aware cache / multimap used by the schema retriever and the
//!   permission checker's rule index (`cache`)
//! - Shared limits and constants (`limits`)

pub mod cache;
pub mod diagnostics;
pub mod limits;
pub mod location;

pub use diagnostics::{Diagnostic, DiagnosticSeverity, TypeCheckError};
pub use location::Location;
