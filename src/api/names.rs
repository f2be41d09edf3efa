//! Name → id lookup.
//!
//! The key codec treats `pokemon/pikachu` and `pokemon/25` as different
//! keys. [`NameIndex`] remembers the mapping as it is observed (list pages,
//! fetched entities) so the facade can key everything by numeric id and a
//! lookup by name hits the same entry as a lookup by id.
//!
//! Moka-backed and bounded; a miss only costs one request under the name
//! key.

use moka::sync::Cache;

use super::types::NamedResource;
use crate::key::Identifier;

/// Default capacity: comfortably above the number of species.
pub const DEFAULT_CAPACITY: u64 = 4_096;

#[derive(Clone)]
pub struct NameIndex {
    by_name: Cache<String, u64>,
}

impl Default for NameIndex {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NameIndex {
    pub fn new(capacity: u64) -> Self {
        Self {
            by_name: Cache::builder().max_capacity(capacity).build(),
        }
    }

    pub fn record(&self, name: &str, id: u64) {
        self.by_name.insert(name.trim().to_lowercase(), id);
    }

    /// Record every `{name, url}` pair whose URL carries an id.
    pub fn record_all<'a>(&self, resources: impl IntoIterator<Item = &'a NamedResource>) {
        for resource in resources {
            if let Some(id) = resource.id() {
                self.record(&resource.name, id);
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<u64> {
        self.by_name.get(&name.trim().to_lowercase())
    }

    /// Numeric form of `ident` when known, otherwise `ident` unchanged.
    pub fn canonical(&self, ident: &Identifier) -> Identifier {
        match ident {
            Identifier::Id(id) => Identifier::Id(*id),
            Identifier::Name(name) => match self.lookup(name) {
                Some(id) => Identifier::Id(id),
                None => Identifier::Name(name.clone()),
            },
        }
    }
}
