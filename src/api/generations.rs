//! Generation id ranges.

use std::ops::RangeInclusive;

use rand::Rng;
use serde::Serialize;

/// Highest national dex number covered.
pub const TOTAL_POKEMON: u64 = 1025;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Generation {
    pub number: u8,
    pub region: &'static str,
    pub start: u64,
    pub end: u64,
}

impl Generation {
    pub fn range(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }

    /// Number of species introduced in this generation.
    pub fn species_count(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn label(&self) -> String {
        format!("Gen {} ({})", self.number, self.region)
    }
}

pub const GENERATIONS: [Generation; 9] = [
    Generation { number: 1, region: "Kanto", start: 1, end: 151 },
    Generation { number: 2, region: "Johto", start: 152, end: 251 },
    Generation { number: 3, region: "Hoenn", start: 252, end: 386 },
    Generation { number: 4, region: "Sinnoh", start: 387, end: 493 },
    Generation { number: 5, region: "Unova", start: 494, end: 649 },
    Generation { number: 6, region: "Kalos", start: 650, end: 721 },
    Generation { number: 7, region: "Alola", start: 722, end: 809 },
    Generation { number: 8, region: "Galar", start: 810, end: 905 },
    Generation { number: 9, region: "Paldea", start: 906, end: 1025 },
];

pub fn generation(number: u8) -> Option<&'static Generation> {
    GENERATIONS.iter().find(|g| g.number == number)
}

/// Id range for a generation setting; `None` or an unknown number means
/// every generation.
pub fn range_for(generation_number: Option<u8>) -> RangeInclusive<u64> {
    generation_number
        .and_then(generation)
        .map(Generation::range)
        .unwrap_or(1..=TOTAL_POKEMON)
}

/// Uniformly random id within [`range_for`].
pub fn random_id(generation_number: Option<u8>) -> u64 {
    rand::rng().random_range(range_for(generation_number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_contiguous() {
        assert_eq!(GENERATIONS[0].start, 1);
        for pair in GENERATIONS.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        assert_eq!(GENERATIONS[8].end, TOTAL_POKEMON);
    }

    #[test]
    fn range_for_setting() {
        assert_eq!(range_for(Some(1)), 1..=151);
        assert_eq!(range_for(None), 1..=1025);
        assert_eq!(range_for(Some(42)), 1..=1025);
        assert_eq!(generation(9).map(Generation::label).as_deref(), Some("Gen 9 (Paldea)"));
    }

    #[test]
    fn random_id_stays_in_range() {
        for _ in 0..200 {
            let id = random_id(Some(2));
            assert!((152..=251).contains(&id));
        }
    }
}
