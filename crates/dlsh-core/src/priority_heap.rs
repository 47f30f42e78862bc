#![forbid(unsafe_code)]

//! Binary heap with reversible traversal.
//!
//! [`PriorityHeap::next`] removes the root by parking it just past the active
//! region; [`PriorityHeap::prev`] brings the most recently parked entry back.
//! Walking `k` steps forward and `k` steps back restores the same top, which
//! is what history suggestion cycling with Up/Down relies on.
//!
//! ```
//! use dlsh_core::priority_heap::{HeapKind, PriorityHeap};
//!
//! let mut heap = PriorityHeap::new(HeapKind::Max);
//! heap.insert("old", 1).unwrap();
//! heap.insert("new", 7).unwrap();
//! assert_eq!(heap.top(), Some(&"new"));
//! heap.next();
//! assert_eq!(heap.top(), Some(&"old"));
//! heap.prev();
//! assert_eq!(heap.top(), Some(&"new"));
//! ```

use std::fmt;

/// Ordering of a [`PriorityHeap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeapKind {
    /// Highest priority on top.
    #[default]
    Max,
    /// Lowest priority on top.
    Min,
}

impl HeapKind {
    fn outranks(self, a: usize, b: usize) -> bool {
        match self {
            Self::Max => a > b,
            Self::Min => a < b,
        }
    }
}

/// Errors from [`PriorityHeap::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeapError {
    /// Entries are parked by a traversal; inserting now would lose them.
    TraversalInProgress { size: usize, capacity: usize },
}

impl fmt::Display for HeapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraversalInProgress { size, capacity } => write!(
                f,
                "cannot insert while traversing ({size} of {capacity} entries active)"
            ),
        }
    }
}

impl std::error::Error for HeapError {}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry<T> {
    item: T,
    priority: usize,
}

/// Array-backed heap whose popped entries stay recoverable.
///
/// `entries[..size]` is the active heap; `entries[size..]` holds parked
/// entries, the one at `entries[size]` being the most recently popped.
#[derive(Debug, Clone)]
pub struct PriorityHeap<T> {
    entries: Vec<Entry<T>>,
    size: usize,
    kind: HeapKind,
}

impl<T> Default for PriorityHeap<T> {
    fn default() -> Self {
        Self::new(HeapKind::Max)
    }
}

impl<T> PriorityHeap<T> {
    #[must_use]
    pub fn new(kind: HeapKind) -> Self {
        Self {
            entries: Vec::new(),
            size: 0,
            kind,
        }
    }

    #[must_use]
    pub fn kind(&self) -> HeapKind {
        self.kind
    }

    /// Active entries.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Active plus parked entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Add an entry. Rejected while any entry is parked.
    pub fn insert(&mut self, item: T, priority: usize) -> Result<(), HeapError> {
        if self.size != self.entries.len() {
            return Err(HeapError::TraversalInProgress {
                size: self.size,
                capacity: self.entries.len(),
            });
        }
        self.entries.push(Entry { item, priority });
        self.size += 1;
        self.sift_up(self.size - 1);
        Ok(())
    }

    /// Reorder the active region under `kind`.
    pub fn heapify(&mut self, kind: HeapKind) {
        self.kind = kind;
        for i in (0..self.size / 2).rev() {
            self.sift_down(i);
        }
    }

    #[must_use]
    pub fn top(&self) -> Option<&T> {
        self.entries[..self.size].first().map(|e| &e.item)
    }

    #[must_use]
    pub fn top_priority(&self) -> Option<usize> {
        self.entries[..self.size].first().map(|e| e.priority)
    }

    /// Whether [`next`](Self::next) would leave a new top behind.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.size > 1
    }

    /// Whether a parked entry can be restored.
    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.size < self.entries.len()
    }

    /// Park the top and promote the runner-up. No-op when nothing is active.
    pub fn next(&mut self) {
        if self.size == 0 {
            return;
        }
        self.size -= 1;
        self.entries.swap(0, self.size);
        self.sift_down(0);
    }

    /// Restore the most recently parked entry. No-op when nothing is parked.
    pub fn prev(&mut self) {
        if !self.has_prev() {
            return;
        }
        self.size += 1;
        self.sift_up(self.size - 1);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if !self
                .kind
                .outranks(self.entries[i].priority, self.entries[parent].priority)
            {
                break;
            }
            self.entries.swap(i, parent);
            i = parent;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut best = i;
            if left < self.size
                && self
                    .kind
                    .outranks(self.entries[left].priority, self.entries[best].priority)
            {
                best = left;
            }
            if right < self.size
                && self
                    .kind
                    .outranks(self.entries[right].priority, self.entries[best].priority)
            {
                best = right;
            }
            if best == i {
                break;
            }
            self.entries.swap(i, best);
            i = best;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heap_of(priorities: &[usize], kind: HeapKind) -> PriorityHeap<usize> {
        let mut heap = PriorityHeap::new(kind);
        for &p in priorities {
            heap.insert(p, p).unwrap();
        }
        heap
    }

    #[test]
    fn max_heap_pops_descending() {
        let mut heap = heap_of(&[3, 9, 1, 7, 5], HeapKind::Max);
        let mut seen = Vec::new();
        while let Some(&top) = heap.top() {
            seen.push(top);
            heap.next();
        }
        assert_eq!(seen, vec![9, 7, 5, 3, 1]);
        assert_eq!(heap.capacity(), 5);
    }

    #[test]
    fn min_heap_pops_ascending() {
        let mut heap = heap_of(&[3, 9, 1], HeapKind::Min);
        assert_eq!(heap.top(), Some(&1));
        heap.next();
        assert_eq!(heap.top(), Some(&3));
    }

    #[test]
    fn heapify_switches_order() {
        let mut heap = heap_of(&[4, 2, 8, 6], HeapKind::Max);
        assert_eq!(heap.top(), Some(&8));
        heap.heapify(HeapKind::Min);
        assert_eq!(heap.top(), Some(&2));
        assert_eq!(heap.kind(), HeapKind::Min);
    }

    #[test]
    fn prev_undoes_next() {
        let mut heap = heap_of(&[10, 20, 30], HeapKind::Max);
        heap.next();
        heap.next();
        assert_eq!(heap.top(), Some(&10));
        heap.prev();
        assert_eq!(heap.top(), Some(&20));
        heap.prev();
        assert_eq!(heap.top(), Some(&30));
        assert!(!heap.has_prev());
    }

    #[test]
    fn insert_rejected_during_traversal() {
        let mut heap = heap_of(&[1, 2], HeapKind::Max);
        heap.next();
        assert_eq!(
            heap.insert(5, 5),
            Err(HeapError::TraversalInProgress {
                size: 1,
                capacity: 2
            })
        );
        heap.prev();
        assert!(heap.insert(5, 5).is_ok());
        assert_eq!(heap.top_priority(), Some(5));
    }

    #[test]
    fn boundaries() {
        let mut heap: PriorityHeap<usize> = PriorityHeap::default();
        assert!(heap.top().is_none());
        assert!(!heap.has_next());
        assert!(!heap.has_prev());
        heap.next();
        heap.prev();
        assert_eq!(heap.size(), 0);

        heap.insert(1, 1).unwrap();
        assert!(!heap.has_next());
        heap.next();
        assert!(heap.is_empty());
        assert!(heap.has_prev());
    }
}
