//! Ordered, in-memory intervention store.
//!
//! Order is display order. Removal is positional because the presentation
//! layer addresses rows by their rendered index.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::intervention::Intervention;

/// Thread-safe ordered collection of interventions.
#[derive(Debug, Default)]
pub struct InterventionStore {
    items: RwLock<Vec<Intervention>>,
    revision: AtomicU64,
}

impl InterventionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an intervention. Duplicates are allowed.
    pub fn add(&self, intervention: Intervention) {
        let mut items = self.items.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        items.push(intervention);
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// Removes the intervention at `index`.
    ///
    /// Returns `None` and leaves the store unchanged when `index` is out of range.
    pub fn remove_at(&self, index: usize) -> Option<Intervention> {
        let mut items = self.items.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if index >= items.len() {
            return None;
        }
        let removed = items.remove(index);
        self.revision.fetch_add(1, Ordering::AcqRel);
        Some(removed)
    }

    /// Snapshot of the current sequence.
    #[must_use]
    pub fn list(&self) -> Vec<Intervention> {
        self.read(<[Intervention]>::to_vec)
    }

    /// Runs `f` against the current sequence without copying it.
    pub fn read<R>(&self, f: impl FnOnce(&[Intervention]) -> R) -> R {
        let items = self.items.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&items)
    }

    /// Number of stored interventions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(<[Intervention]>::len)
    }

    /// True when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation counter; bumps on every successful add or remove.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intervention::InterventionType;

    #[test]
    fn add_preserves_order_and_duplicates() {
        let store = InterventionStore::new();
        let a = Intervention::place(InterventionType::Trees, 1.0, 1.0);
        let b = Intervention::place(InterventionType::Park, 2.0, 2.0);
        store.add(a.clone());
        store.add(b.clone());
        store.add(a.clone());

        let items = store.list();
        assert_eq!(items, vec![a.clone(), b, a]);
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn remove_at_is_positional() {
        let store = InterventionStore::new();
        let a = Intervention::place(InterventionType::Trees, 1.0, 1.0);
        let b = Intervention::place(InterventionType::CoolRoof, 2.0, 2.0);
        store.add(a.clone());
        store.add(b.clone());

        assert_eq!(store.remove_at(0), Some(a));
        assert_eq!(store.list(), vec![b]);
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let store = InterventionStore::new();
        store.add(Intervention::place(InterventionType::Trees, 1.0, 1.0));
        let rev = store.revision();

        assert_eq!(store.remove_at(1), None);
        assert_eq!(store.remove_at(usize::MAX), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), rev);
    }

    #[test]
    fn list_is_a_snapshot() {
        let store = InterventionStore::new();
        store.add(Intervention::place(InterventionType::Trees, 1.0, 1.0));
        let snapshot = store.list();
        store.add(Intervention::place(InterventionType::Park, 2.0, 2.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }
}
