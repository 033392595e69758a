//! The schema catalogue client.

use tt_ast::ClassDef;
use tt_common::diagnostics::Result;

use crate::mixin::MixinDef;

/// The single collaborator `SchemaRetriever` batches requests through.
///
/// The scheduling model is single-threaded cooperative: there
/// is no `async fn` here because there is no executor to suspend to. A
/// caller wiring this to a real network client performs the suspension
/// itself at the call site (e.g. blocking on its own future) before
/// returning; `SchemaRetriever::flush` is the one place that call happens.
pub trait SchemaClient {
    /// Fetch the full source-derived class definition for a single kind,
    /// bypassing the batch (used when a caller needs one class
    /// immediately, e.g. resolving `id` against a specific device).
    fn get_device_code(&mut self, kind: &str) -> Result<ClassDef>;

    /// Batch-fetch class definitions for every kind in `kinds`.
    ///
    /// `include_metadata` requests `doc`/`url` annotations; retrievers
    /// serving a typechecker-only workload may pass `false` to fetch the
    /// lighter type-only form. Kinds the catalogue doesn't recognize are
    /// simply absent from the returned list — `SchemaRetriever::flush`
    /// negative-caches those.
    fn get_schemas(&mut self, kinds: &[String], include_metadata: bool) -> Result<Vec<ClassDef>>;

    /// Fetch the mixin table.
    fn get_mixins(&mut self) -> Result<rustc_hash::FxHashMap<String, MixinDef>>;
}
