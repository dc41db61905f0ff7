//! Strict in-order write queue.
//!
//! Holds commands that are not yet fully written. At most one item, the
//! head, is in flight; it leaves the queue only after its write completes,
//! and only then is the next head sent.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

// ============================================================================
// PendingQueue
// ============================================================================

/// Ordered backlog with a single in-flight slot.
#[derive(Debug)]
pub(crate) struct PendingQueue<T> {
    items: VecDeque<T>,
    in_flight: bool,
}

impl<T> Default for PendingQueue<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            in_flight: false,
        }
    }
}

impl<T> PendingQueue<T> {
    /// Appends an item. Returns `true` if it is the sole item, in which case
    /// the caller must send it now via [`start_head`](Self::start_head).
    pub(crate) fn push(&mut self, item: T) -> bool {
        self.items.push_back(item);
        !self.in_flight && self.items.len() == 1
    }

    /// Marks the head as in flight and returns it.
    ///
    /// Returns `None` if something is already in flight or the queue is empty.
    pub(crate) fn start_head(&mut self) -> Option<&mut T> {
        if self.in_flight {
            return None;
        }
        let head = self.items.front_mut()?;
        self.in_flight = true;
        Some(head)
    }

    /// Pops the in-flight head once its write completed.
    pub(crate) fn finish_head(&mut self) -> Option<T> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.items.pop_front()
    }

    /// Removes every item.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.in_flight = false;
        self.items.drain(..)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub(crate) fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn test_only_first_push_triggers_send() {
        let mut queue = PendingQueue::default();
        assert!(queue.push(1));
        assert!(!queue.push(2));
        assert!(!queue.push(3));
    }

    #[test]
    fn test_one_in_flight() {
        let mut queue = PendingQueue::default();
        queue.push('a');
        queue.push('b');

        assert_eq!(queue.start_head().copied(), Some('a'));
        assert!(queue.start_head().is_none());
        assert!(queue.is_in_flight());

        assert_eq!(queue.finish_head(), Some('a'));
        assert!(!queue.is_in_flight());
        assert_eq!(queue.start_head().copied(), Some('b'));
    }

    #[test]
    fn test_finish_without_start_is_noop() {
        let mut queue = PendingQueue::default();
        queue.push(1);
        assert_eq!(queue.finish_head(), None);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_push_while_in_flight_with_empty_backlog() {
        let mut queue = PendingQueue::default();
        queue.push(1);
        queue.start_head();
        assert!(!queue.push(2));
    }

    proptest! {
        #[test]
        fn prop_completion_order_equals_push_order(items in proptest::collection::vec(any::<u16>(), 1..64)) {
            let mut queue = PendingQueue::default();
            let mut sent = Vec::new();

            for item in &items {
                if queue.push(*item) {
                    sent.extend(queue.start_head().copied());
                }
            }
            while let Some(done) = queue.finish_head() {
                prop_assert_eq!(Some(&done), sent.last());
                sent.extend(queue.start_head().copied());
            }

            prop_assert_eq!(sent, items);
        }
    }
}
