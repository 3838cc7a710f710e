//! Resource ID allocation

use std::collections::BTreeSet;

/// Hands out resource IDs for one document build
///
/// IDs start at 1 and increase by one; anything reserved up front (resources the
/// document carries through untouched) is never returned.
#[derive(Debug, Clone)]
pub struct ResourceIdAllocator {
    next: usize,
    reserved: BTreeSet<usize>,
}

impl ResourceIdAllocator {
    /// Allocator with nothing reserved
    pub fn new() -> Self {
        Self {
            next: 1,
            reserved: BTreeSet::new(),
        }
    }

    /// Allocator that skips every ID in `reserved`
    pub fn with_reserved(reserved: impl IntoIterator<Item = usize>) -> Self {
        Self {
            next: 1,
            reserved: reserved.into_iter().collect(),
        }
    }

    /// Mark `id` as taken
    pub fn reserve(&mut self, id: usize) {
        self.reserved.insert(id);
    }

    /// True when `id` was reserved or already handed out
    pub fn is_taken(&self, id: usize) -> bool {
        self.reserved.contains(&id) || (id != 0 && id < self.next)
    }

    /// Next free ID
    pub fn allocate(&mut self) -> usize {
        while self.reserved.contains(&self.next) {
            self.next += 1;
        }
        let id = self.next;
        self.next += 1;
        id
    }
}

impl Default for ResourceIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_starts_at_one() {
        let mut ids = ResourceIdAllocator::default();
        assert!(!ids.is_taken(1));
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);
    }

    #[test]
    fn test_sequential_from_one() {
        let mut ids = ResourceIdAllocator::new();
        assert_eq!(ids.allocate(), 1);
        assert_eq!(ids.allocate(), 2);
        assert_eq!(ids.allocate(), 3);
    }

    #[test]
    fn test_reserved_ids_skipped() {
        let mut ids = ResourceIdAllocator::with_reserved([1, 3, 4]);
        assert_eq!(ids.allocate(), 2);
        assert_eq!(ids.allocate(), 5);
        ids.reserve(6);
        assert_eq!(ids.allocate(), 7);
        assert!(ids.is_taken(6));
        assert!(ids.is_taken(2));
        assert!(!ids.is_taken(8));
    }
}
