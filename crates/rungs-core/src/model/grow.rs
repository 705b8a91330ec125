use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// Grow-only, insertion-ordered set.
///
/// Backs every collection on the aggregate that must never shrink: badges,
/// defeated bosses, passed exams, titles and completed modules. There is no
/// removal API; the only mutation is [`GrowSet::insert`], which ignores
/// duplicates.
///
/// Merge is a set union that keeps the receiver's order and appends unseen
/// elements from the other side, so it stays commutative up to ordering,
/// associative, and idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrowSet<T: PartialEq> {
    elements: Vec<T>,
}

impl<T: PartialEq> Default for GrowSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: PartialEq> GrowSet<T> {
    /// Create a new empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    /// Insert an element. Returns `true` if it was not already present.
    pub fn insert(&mut self, element: T) -> bool {
        if self.elements.contains(&element) {
            return false;
        }
        self.elements.push(element);
        true
    }

    /// Returns true if the set contains the element.
    pub fn contains<Q>(&self, element: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: PartialEq + ?Sized,
    {
        self.elements.iter().any(|e| e.borrow() == element)
    }

    /// Returns the number of elements in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Elements in insertion order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl<T: PartialEq + Clone> GrowSet<T> {
    /// Merge another set into this one (set union).
    pub fn merge(&mut self, other: &Self) {
        for element in &other.elements {
            self.insert(element.clone());
        }
    }
}

impl<T: PartialEq> FromIterator<T> for GrowSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for element in iter {
            set.insert(element);
        }
        set
    }
}

impl<'a, T: PartialEq> IntoIterator for &'a GrowSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_reports_novelty() {
        let mut set = GrowSet::new();
        assert!(set.insert("module_0".to_string()));
        assert!(set.insert("module_1".to_string()));
        assert!(!set.insert("module_0".to_string()));
        assert_eq!(set.len(), 2);
        assert!(set.contains("module_1"));
    }

    #[test]
    fn keeps_insertion_order() {
        let set: GrowSet<&str> = ["b", "a", "c", "a"].into_iter().collect();
        assert_eq!(set.as_slice(), &["b", "a", "c"]);
    }

    #[test]
    fn merge_is_union() {
        let mut a: GrowSet<u32> = [1, 2].into_iter().collect();
        let b: GrowSet<u32> = [2, 3].into_iter().collect();
        a.merge(&b);
        assert_eq!(a.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn merge_is_idempotent() {
        let mut a: GrowSet<u32> = [1, 2].into_iter().collect();
        let snapshot = a.clone();
        a.merge(&snapshot);
        assert_eq!(a, snapshot);
    }

    #[test]
    fn serializes_as_plain_list() {
        let set: GrowSet<String> = ["redhawk".to_string()].into_iter().collect();
        let json = serde_json::to_string(&set).expect("serialize");
        assert_eq!(json, r#"["redhawk"]"#);
        let back: GrowSet<String> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, set);
    }
}
