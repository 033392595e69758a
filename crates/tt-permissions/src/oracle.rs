//! The group-membership oracle.

use rustc_hash::FxHashMap;
use tt_common::diagnostics::Result;

/// Maps a contact entity to the group entities it belongs to. A
/// production implementation backs this with the user's contact-group
/// directory; out of scope here, same as `SchemaClient`'s transport.
pub trait GroupOracle {
    fn groups_of(&mut self, contact: &str) -> Result<Vec<String>>;
}

/// Caches `GroupOracle` answers for the lifetime of one permission-check
/// session. Unlike `tt_schema::TtlCache`, group membership has no TTL here
/// — the oracle is queried once per session, not until some expiry, so a
/// plain map suffices.
pub struct CachedOracle<'o> {
    inner: &'o mut dyn GroupOracle,
    cache: FxHashMap<String, Vec<String>>,
}

impl<'o> CachedOracle<'o> {
    #[must_use]
    pub fn new(inner: &'o mut dyn GroupOracle) -> Self {
        CachedOracle {
            inner,
            cache: FxHashMap::default(),
        }
    }

    pub fn groups_of(&mut self, contact: &str) -> Result<Vec<String>> {
        if let Some(groups) = self.cache.get(contact) {
            return Ok(groups.clone());
        }
        let groups = self.inner.groups_of(contact)?;
        self.cache.insert(contact.to_string(), groups.clone());
        Ok(groups)
    }

    /// Warm the cache for every contact in `contacts`, querying the oracle
    /// at most once per distinct contact.
    pub fn prefetch(&mut self, contacts: &[String]) -> Result<()> {
        for contact in contacts {
            self.groups_of(contact)?;
        }
        Ok(())
    }
}
