use crate::core::models::structure::Structure;
use std::collections::VecDeque;

/// Bounded insertion-ordered set of rejected MFE structures.
///
/// The optimizer fills this with folds a candidate sequence preferred over
/// the targets; later candidates are checked against the stored structures
/// newest-first. When full, adding evicts the oldest entry. Duplicates are
/// never stored.
#[derive(Debug, Clone)]
pub struct ConstraintLedger {
    entries: VecDeque<Structure>,
    capacity: usize,
}

impl ConstraintLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Inserts a structure. Returns false (and leaves the ledger unchanged)
    /// when it is already present or the capacity is zero.
    pub fn add(&mut self, structure: Structure) -> bool {
        if self.capacity == 0 || self.entries.contains(&structure) {
            return false;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(structure);
        true
    }

    pub fn contains(&self, structure: &Structure) -> bool {
        self.entries.contains(structure)
    }

    /// Stored structures, most recently added first.
    pub fn iter_newest_first(&self) -> impl Iterator<Item = &Structure> {
        self.entries.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
