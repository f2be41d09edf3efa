//! Grid filters: name search and type selection.
//!
//! [`FilterStore`] is a cloneable handle; every clone sees the same
//! filters. Typed search input goes through
//! [`search_debouncer`](FilterStore::search_debouncer) so only the query
//! typed last is applied.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;

use crate::api::Pokemon;
use crate::cache::lock;
use crate::debounce::Debouncer;

/// Delay between the last keystroke and applying the search query.
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Current filter values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// Lowercased; empty means no name filter.
    pub search_query: String,
    pub selected_type: Option<String>,
}

impl FilterState {
    /// Whether any filter is set. Loading further pages is pointless while
    /// one is, since filters only apply to what is loaded.
    pub fn is_active(&self) -> bool {
        !self.search_query.is_empty() || self.selected_type.is_some()
    }

    pub fn matches(&self, pokemon: &Pokemon) -> bool {
        if !self.search_query.is_empty() && !pokemon.name.contains(&self.search_query) {
            return false;
        }
        match &self.selected_type {
            Some(kind) => pokemon.types.iter().any(|slot| slot.kind.name == *kind),
            None => true,
        }
    }

    /// Matching entries of `pokemon`, in order.
    pub fn apply<'a>(&self, pokemon: &'a [Pokemon]) -> Vec<&'a Pokemon> {
        pokemon.iter().filter(|p| self.matches(p)).collect()
    }
}

/// Shared filter state.
#[derive(Clone, Default)]
pub struct FilterStore {
    state: Arc<Mutex<FilterState>>,
}

impl FilterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FilterState {
        lock(&self.state).clone()
    }

    pub fn set_search_query(&self, query: &str) {
        let query = query.to_lowercase();
        debug!(query, "search query set");
        lock(&self.state).search_query = query;
    }

    pub fn set_selected_type(&self, type_name: Option<&str>) {
        lock(&self.state).selected_type = type_name.map(str::to_owned);
    }

    pub fn reset(&self) {
        *lock(&self.state) = FilterState::default();
    }

    /// Matching entries of `pokemon` under the current filters.
    pub fn apply<'a>(&self, pokemon: &'a [Pokemon]) -> Vec<&'a Pokemon> {
        self.state().apply(pokemon)
    }

    /// A debouncer that sets the search query on this store.
    pub fn search_debouncer(&self, delay: Duration) -> Debouncer<String> {
        let store = self.clone();
        Debouncer::new(delay, move |query: String| store.set_search_query(&query))
    }
}
