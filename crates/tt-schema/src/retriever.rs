//! The batched, TTL-cached schema retriever.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};
use tt_ast::{ClassDef, ExpressionSignature, FunctionKind};
use tt_common::diagnostics::Result;
use tt_common::limits::{SCHEMA_NEGATIVE_TTL, SCHEMA_POSITIVE_TTL};
use tt_common::cache::TtlCache;

use crate::client::SchemaClient;

/// The type-only half of a class's cached signatures: channel name to
/// resolved `ExpressionSignature`, split by function kind.
#[derive(Clone, Debug, Default)]
pub struct ClassSignatures {
    pub queries: FxHashMap<String, ExpressionSignature>,
    pub actions: FxHashMap<String, ExpressionSignature>,
}

impl ClassSignatures {
    #[must_use]
    pub fn from_class(class: &ClassDef) -> Self {
        let queries = class
            .queries
            .iter()
            .map(|(name, def)| (name.clone(), ExpressionSignature::from_function_def(def)))
            .collect();
        let actions = class
            .actions
            .iter()
            .map(|(name, def)| (name.clone(), ExpressionSignature::from_function_def(def)))
            .collect();
        ClassSignatures { queries, actions }
    }

    #[must_use]
    pub fn get(&self, kind: FunctionKind, channel: &str) -> Option<&ExpressionSignature> {
        match kind {
            FunctionKind::Query => self.queries.get(channel),
            FunctionKind::Action => self.actions.get(channel),
        }
    }
}

/// Wraps a `SchemaClient`, batching requests across a single event
/// boundary and caching both full class definitions and type-only
/// signatures.
///
/// Requests don't fire a network call immediately: `request` only marks a
/// kind as pending. `flush` is the explicit "event boundary" the driver
/// calls once schema pre-loading has walked the
/// whole program and collected every kind it needs, combining them into
/// one `get_schemas` call.
pub struct SchemaRetriever {
    full: TtlCache<String, ClassDef>,
    signatures: TtlCache<String, ClassSignatures>,
    negative: TtlCache<String, ()>,
    pending: FxHashSet<String>,
    /// Kinds fetched over the network (via `flush` or `fetch_one`) since
    /// the last `take_last_fetched` drain — `inject`ed classes (a
    /// program's own inline `ClassDef`s) never land here, since those
    /// were typechecked as part of the program itself, not fetched
    /// unvalidated from a catalogue. The driver drains this after every
    /// `flush`/`fetch_one` to typecheck what just came back before
    /// anything trusts it (spec.md §4.6: "returned class definitions are
    /// themselves typechecked... before being cached").
    last_fetched: Vec<String>,
}

impl Default for SchemaRetriever {
    fn default() -> Self {
        SchemaRetriever {
            full: TtlCache::new(),
            signatures: TtlCache::new(),
            negative: TtlCache::new(),
            pending: FxHashSet::default(),
            last_fetched: Vec::new(),
        }
    }
}

impl SchemaRetriever {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `kind` as needed. A no-op if it's already cached (positively
    /// or negatively) and not expired.
    pub fn request(&mut self, kind: &str) {
        if self.signatures.get(&kind.to_string()).is_some() {
            return;
        }
        if self.negative.get(&kind.to_string()).is_some() {
            return;
        }
        trace!(kind, "queuing schema request");
        self.pending.insert(kind.to_string());
    }

    /// Explicitly inject a class with no expiration, bypassing the
    /// network entirely — used for a program's own inline `ClassDef`s.
    pub fn inject(&mut self, class: ClassDef) {
        let signatures = ClassSignatures::from_class(&class);
        self.pending.remove(&class.name);
        self.negative.remove(&class.name);
        self.signatures.insert_permanent(class.name.clone(), signatures);
        self.full.insert_permanent(class.name.clone(), class);
    }

    /// Resolve every pending kind through one batched `get_schemas` call.
    /// Kinds absent from the response are negative-cached.
    pub fn flush(&mut self, client: &mut impl SchemaClient) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let kinds: Vec<String> = self.pending.drain().collect();
        debug!(count = kinds.len(), "flushing batched schema request");
        let classes = client.get_schemas(&kinds, true)?;
        let mut found: FxHashSet<String> = FxHashSet::default();
        for class in classes {
            found.insert(class.name.clone());
            self.last_fetched.push(class.name.clone());
            let signatures = ClassSignatures::from_class(&class);
            self.signatures
                .insert(class.name.clone(), signatures, SCHEMA_POSITIVE_TTL);
            self.full
                .insert(class.name.clone(), class, SCHEMA_POSITIVE_TTL);
        }
        for kind in kinds {
            if !found.contains(&kind) {
                self.negative.insert(kind, (), SCHEMA_NEGATIVE_TTL);
            }
        }
        Ok(())
    }

    /// Fetch one class immediately, bypassing the batch queue (used for
    /// `id`-selector resolution against a specific device).
    pub fn fetch_one(&mut self, kind: &str, client: &mut impl SchemaClient) -> Result<()> {
        let class = client.get_device_code(kind)?;
        self.last_fetched.push(class.name.clone());
        self.inject(class);
        Ok(())
    }

    /// Drain the kinds fetched over the network since the last drain.
    /// The driver calls this right after `flush`/`fetch_one` to typecheck
    /// each newly-cached class before trusting it.
    pub fn take_last_fetched(&mut self) -> Vec<String> {
        std::mem::take(&mut self.last_fetched)
    }

    /// Look up a previously-flushed or injected class's type-only
    /// signatures. `None` means either a genuine cache miss (caller
    /// should have requested + flushed first) or a negative-cached
    /// miss.
    pub fn signatures(&mut self, kind: &str) -> Option<&ClassSignatures> {
        self.signatures.get(&kind.to_string())
    }

    /// Look up a previously-flushed or injected class's full definition
    /// (queries/actions, annotations, doc/url metadata).
    pub fn full_class(&mut self, kind: &str) -> Option<&ClassDef> {
        self.full.get(&kind.to_string())
    }

    #[must_use]
    pub fn is_negatively_cached(&mut self, kind: &str) -> bool {
        self.negative.get(&kind.to_string()).is_some()
    }
}
