//! Pluggable, batched, TTL-cached schema retrieval.
//!
//! The wire format for `get_device_code`/`get_schemas` (a ThingTalk class
//! source string) is out of scope, so `SchemaClient` here returns
//! already-parsed `ClassDef` values directly rather than source text —
//! the same simplification the in-memory test client makes, returning
//! `{args[], types[]}` rather than a source string. A caller backing this
//! trait with a real network client is expected to parse the catalogue
//! response itself before handing it to `SchemaRetriever`.

pub mod client;
pub mod memory;
pub mod mixin;
pub mod retriever;

pub use client::SchemaClient;
pub use memory::{MemoryClient, MemorySchema};
pub use mixin::MixinDef;
pub use retriever::{ClassSignatures, SchemaRetriever};
