//! Set difference over membership facts.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::OnceLock;

/// Insertion-ordered set.
#[derive(Debug, Clone)]
struct OrderedSet<T> {
    items: Vec<T>,
    index: HashSet<T>,
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashSet::new(),
        }
    }

    fn insert(&mut self, item: T) {
        if self.index.insert(item.clone()) {
            self.items.push(item);
        }
    }

    fn contains(&self, item: &T) -> bool {
        self.index.contains(item)
    }

    fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    /// Items of `self` not in `other`, in insertion order.
    fn difference(&self, other: &OrderedSet<T>) -> Vec<T> {
        self.items
            .iter()
            .filter(|item| !other.contains(item))
            .cloned()
            .collect()
    }
}

/// Pending additions and removals for one collection of items.
///
/// An item both added and removed cancels out: it appears in neither
/// [`effective_added`](Self::effective_added) nor
/// [`effective_removed`](Self::effective_removed). The effective views are
/// computed on first read and recomputed after any mutation.
///
/// ```rust
/// use ldap_provisioning::membership::MembershipDiff;
///
/// let mut diff = MembershipDiff::between(vec!["a", "b"], vec!["b", "c"]);
/// assert_eq!(diff.effective_removed(), &["a"]);
/// assert_eq!(diff.effective_added(), &["c"]);
///
/// diff.remove("c");
/// assert!(diff.effective_added().is_empty());
/// ```
#[derive(Debug)]
pub struct MembershipDiff<T> {
    added: OrderedSet<T>,
    removed: OrderedSet<T>,
    effective_added: OnceLock<Vec<T>>,
    effective_removed: OnceLock<Vec<T>>,
}

impl<T: Eq + Hash + Clone> Default for MembershipDiff<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> MembershipDiff<T> {
    pub fn new() -> Self {
        Self {
            added: OrderedSet::new(),
            removed: OrderedSet::new(),
            effective_added: OnceLock::new(),
            effective_removed: OnceLock::new(),
        }
    }

    /// The diff turning `current` into `desired`.
    pub fn between<C, D>(current: C, desired: D) -> Self
    where
        C: IntoIterator<Item = T>,
        D: IntoIterator<Item = T>,
    {
        let mut diff = Self::new();
        diff.remove_all(current);
        diff.add_all(desired);
        diff
    }

    pub fn add(&mut self, item: T) {
        self.added.insert(item);
        self.invalidate();
    }

    pub fn add_all(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.added.insert(item);
        }
        self.invalidate();
    }

    pub fn remove(&mut self, item: T) {
        self.removed.insert(item);
        self.invalidate();
    }

    pub fn remove_all(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.removed.insert(item);
        }
        self.invalidate();
    }

    /// Discard pending additions. Removals are kept.
    pub fn clear_added(&mut self) {
        self.added.clear();
        self.invalidate();
    }

    /// Added items that were not also removed.
    pub fn effective_added(&self) -> &[T] {
        self.effective_added
            .get_or_init(|| self.added.difference(&self.removed))
    }

    /// Removed items that were not also added.
    pub fn effective_removed(&self) -> &[T] {
        self.effective_removed
            .get_or_init(|| self.removed.difference(&self.added))
    }

    /// True when applying the diff changes nothing.
    pub fn is_empty(&self) -> bool {
        self.effective_added().is_empty() && self.effective_removed().is_empty()
    }

    /// Consume the diff, returning `(effective_removed, effective_added)`.
    pub fn into_effective(self) -> (Vec<T>, Vec<T>) {
        let removed = self.removed.difference(&self.added);
        let added = self.added.difference(&self.removed);
        (removed, added)
    }

    /// Apply to a base set: effective removals first, then additions.
    pub fn apply_to(&self, base: &HashSet<T>) -> HashSet<T> {
        let mut result = base.clone();
        for item in self.effective_removed() {
            result.remove(item);
        }
        for item in self.effective_added() {
            result.insert(item.clone());
        }
        result
    }

    fn invalidate(&mut self) {
        self.effective_added = OnceLock::new();
        self.effective_removed = OnceLock::new();
    }
}
