//! Duplicate suppression for chat message identifiers.

use std::collections::{HashSet, VecDeque};
use std::num::NonZeroUsize;

/// Remembers which message identifiers have already been acted upon.
///
/// The window is bounded by default: once `capacity` distinct identifiers have
/// been marked, marking another one forgets the oldest. The capacity must
/// cover the feed's redelivery horizon for the at-most-once guarantee to hold.
#[derive(Debug, Clone)]
pub struct DedupWindow {
    ids: HashSet<String>,
    order: VecDeque<String>,
    capacity: Option<NonZeroUsize>,
}

impl DedupWindow {
    /// Default number of identifiers remembered.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Creates a window holding at most `capacity` identifiers.
    ///
    /// A capacity of `0` creates an unbounded window.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: HashSet::new(),
            order: VecDeque::new(),
            capacity: NonZeroUsize::new(capacity),
        }
    }

    /// Creates a window that never forgets.
    pub fn unbounded() -> Self {
        Self::with_capacity(0)
    }

    /// Returns `true` if `id` has been marked and not yet evicted.
    pub fn seen(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Records `id` as processed. Marking a known identifier is a no-op.
    pub fn mark(&mut self, id: impl Into<String>) {
        let id = id.into();
        if self.ids.contains(&id) {
            return;
        }

        if let Some(capacity) = self.capacity
            && self.order.len() >= capacity.get()
            && let Some(oldest) = self.order.pop_front()
        {
            self.ids.remove(&oldest);
        }

        self.ids.insert(id.clone());
        self.order.push_back(id);
    }

    /// Returns the number of identifiers currently remembered.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing has been marked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the capacity, or `None` if the window is unbounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity.map(NonZeroUsize::get)
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmarked_is_not_seen() {
        let window = DedupWindow::default();
        assert!(!window.seen("a"));
        assert!(window.is_empty());
    }

    #[test]
    fn test_marked_stays_seen() {
        let mut window = DedupWindow::default();
        window.mark("a");
        for _ in 0..5 {
            assert!(window.seen("a"));
        }
        assert!(!window.seen("b"));
    }

    #[test]
    fn test_mark_is_idempotent() {
        let mut window = DedupWindow::with_capacity(2);
        window.mark("a");
        window.mark("a");
        window.mark("b");
        assert_eq!(window.len(), 2);
        assert!(window.seen("a"));
        assert!(window.seen("b"));
    }

    #[test]
    fn test_oldest_is_evicted_at_capacity() {
        let mut window = DedupWindow::with_capacity(2);
        window.mark("a");
        window.mark("b");
        window.mark("c");

        assert_eq!(window.len(), 2);
        assert!(!window.seen("a"));
        assert!(window.seen("b"));
        assert!(window.seen("c"));
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let mut window = DedupWindow::unbounded();
        for i in 0..1_000 {
            window.mark(i.to_string());
        }
        assert_eq!(window.capacity(), None);
        assert_eq!(window.len(), 1_000);
        assert!(window.seen("0"));
        assert!(window.seen("999"));
    }
}
