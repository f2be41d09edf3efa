//! Two-slot comparison selection.

use std::sync::{Arc, Mutex};

use crate::api::Pokemon;
use crate::cache::lock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareState {
    pub first: Option<Pokemon>,
    pub second: Option<Pokemon>,
    /// Whether the comparison view is shown.
    pub open: bool,
}

impl CompareState {
    pub fn contains(&self, id: u64) -> bool {
        [&self.first, &self.second]
            .into_iter()
            .flatten()
            .any(|p| p.id == id)
    }

    pub fn count(&self) -> usize {
        usize::from(self.first.is_some()) + usize::from(self.second.is_some())
    }

    /// Both selected pokemon, once both slots are filled.
    pub fn pair(&self) -> Option<(&Pokemon, &Pokemon)> {
        Some((self.first.as_ref()?, self.second.as_ref()?))
    }
}

/// Shared comparison selection; clones see the same slots.
#[derive(Clone, Default)]
pub struct CompareStore {
    state: Arc<Mutex<CompareState>>,
}

impl CompareStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CompareState {
        lock(&self.state).clone()
    }

    /// Put `pokemon` in the first free slot, replacing the second slot when
    /// both are taken. Filling the second slot opens the view.
    ///
    /// Returns `false` if it is already selected.
    pub fn add(&self, pokemon: Pokemon) -> bool {
        let mut state = lock(&self.state);
        if state.contains(pokemon.id) {
            return false;
        }
        if state.first.is_none() {
            state.first = Some(pokemon);
        } else if state.second.is_none() {
            state.second = Some(pokemon);
            state.open = true;
        } else {
            state.second = Some(pokemon);
        }
        true
    }

    pub fn remove(&self, slot: Slot) -> Option<Pokemon> {
        let mut state = lock(&self.state);
        match slot {
            Slot::First => state.first.take(),
            Slot::Second => state.second.take(),
        }
    }

    /// Empty both slots and close the view.
    pub fn clear(&self) {
        *lock(&self.state) = CompareState::default();
    }

    pub fn set_open(&self, open: bool) {
        lock(&self.state).open = open;
    }

    pub fn contains(&self, id: u64) -> bool {
        lock(&self.state).contains(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pokemon(id: u64, name: &str) -> Pokemon {
        Pokemon {
            id,
            name: name.to_string(),
            ..Pokemon::default()
        }
    }

    #[test]
    fn fills_first_then_second_and_opens() {
        let store = CompareStore::new();
        assert!(store.add(pokemon(1, "bulbasaur")));
        assert!(!store.state().open);
        assert!(store.add(pokemon(4, "charmander")));

        let state = store.state();
        assert!(state.open);
        assert_eq!(state.count(), 2);
        let (a, b) = state.pair().unwrap();
        assert_eq!((a.id, b.id), (1, 4));
    }

    #[test]
    fn duplicate_is_ignored() {
        let store = CompareStore::new();
        store.add(pokemon(25, "pikachu"));
        assert!(!store.add(pokemon(25, "pikachu")));
        assert_eq!(store.state().count(), 1);
        assert!(store.contains(25));
        assert!(!store.contains(26));
    }

    #[test]
    fn third_pick_replaces_the_second_slot() {
        let store = CompareStore::new();
        store.add(pokemon(1, "bulbasaur"));
        store.add(pokemon(4, "charmander"));
        assert!(store.add(pokemon(7, "squirtle")));

        let state = store.state();
        assert_eq!(state.first.map(|p| p.id), Some(1));
        assert_eq!(state.second.map(|p| p.id), Some(7));
        assert!(!store.contains(4));
    }

    #[test]
    fn remove_frees_a_slot_for_the_next_pick() {
        let store = CompareStore::new();
        store.add(pokemon(1, "bulbasaur"));
        store.add(pokemon(4, "charmander"));
        assert_eq!(store.remove(Slot::First).map(|p| p.id), Some(1));
        assert_eq!(store.remove(Slot::First), None);

        store.add(pokemon(7, "squirtle"));
        let state = store.state();
        assert_eq!(state.first.map(|p| p.id), Some(7));
        assert_eq!(state.second.map(|p| p.id), Some(4));
    }

    #[test]
    fn clear_empties_and_closes() {
        let store = CompareStore::new();
        let shared = store.clone();
        store.add(pokemon(1, "bulbasaur"));
        store.add(pokemon(4, "charmander"));
        shared.clear();
        assert_eq!(store.state(), CompareState::default());

        store.set_open(true);
        assert!(shared.state().open);
    }
}
