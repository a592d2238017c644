//! Streaming "most frequent element" heuristic.

use rustc_hash::FxHashMap;
use std::hash::Hash;

/// Tracks a champion element while consuming a stream.
///
/// Every added element becomes the champion, and the reported count is the
/// total number of times that element has been added so far. The champion
/// therefore is the most recently added value, not the true mode: feeding
/// `A A A B B` ends with `B` counted twice even though `A` occurred three
/// times. Callers treat the count as a heuristic lower bound.
#[derive(Debug, Clone)]
pub struct OccurrenceCounter<T> {
    tallies: FxHashMap<T, u32>,
    best: Option<T>,
    best_occurrences: u32,
}

impl<T> Default for OccurrenceCounter<T> {
    fn default() -> Self {
        Self {
            tallies: FxHashMap::default(),
            best: None,
            best_occurrences: 0,
        }
    }
}

impl<T: Eq + Hash + Clone> OccurrenceCounter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, value: T) {
        let tally = self.tallies.entry(value.clone()).or_insert(0);
        *tally += 1;
        let tally = *tally;

        match &self.best {
            Some(best) if *best == value => self.best_occurrences += 1,
            _ => {
                self.best = Some(value);
                self.best_occurrences = tally;
            }
        }
    }

    /// Current champion
    pub fn best(&self) -> Option<&T> {
        self.best.as_ref()
    }

    /// Tally of the champion at the time it was last updated
    pub fn best_occurrences(&self) -> u32 {
        self.best_occurrences
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none()
    }
}

impl<T: Eq + Hash + Clone> Extend<T> for OccurrenceCounter<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.add(value);
        }
    }
}
