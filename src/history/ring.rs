//! Fixed-capacity ring buffer.
//!
//! # Invariants
//!
//! - The backing storage is allocated once and never reallocates.
//! - `len <= capacity`; slots at or beyond `len` (while filling) are
//!   unreachable through the public API.
//! - Once full, the oldest element sits at `head` and a push overwrites it.
//!
//! ```text
//! FILLING:  [a b c _ _]  head=3 len=3   chronological = a b c
//! WRAPPED:  [f g c d e]  head=2 len=5   chronological = c d e f g
//! ```

use serde::{Deserialize, Serialize};

/// Occupancy phase of a [`RingBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferPhase {
    /// Fewer than `capacity` elements; chronological order is a prefix.
    Filling,
    /// Full; chronological order starts at the write index.
    Wrapped,
}

/// Fixed-capacity FIFO that overwrites its oldest element once full.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Box<[T]>,
    /// Next write position.
    head: usize,
    /// Number of live elements.
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Allocate a buffer with room for `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be non-zero");
        Self {
            slots: vec![T::default(); capacity].into_boxed_slice(),
            head: 0,
            len: 0,
        }
    }
}

impl<T: Copy> RingBuffer<T> {
    /// Append in O(1), evicting the oldest element when full.
    pub fn push(&mut self, value: T) {
        self.slots[self.head] = value;
        self.head = (self.head + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
    }

    /// Forget every element. Slots are overwritten lazily by later pushes.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Number of live elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Fixed capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether the next push evicts.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Current occupancy phase.
    #[must_use]
    pub const fn phase(&self) -> BufferPhase {
        if self.is_full() {
            BufferPhase::Wrapped
        } else {
            BufferPhase::Filling
        }
    }

    /// Live elements as two slices, oldest first: `older` then `newer`.
    ///
    /// While filling, `newer` is empty.
    #[must_use]
    pub fn as_slices(&self) -> (&[T], &[T]) {
        if self.is_full() {
            let (newer, older) = self.slots.split_at(self.head);
            (older, newer)
        } else {
            (&self.slots[..self.len], &[])
        }
    }

    /// Iterate oldest to newest without mutating the buffer.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (older, newer) = self.as_slices();
        older.iter().chain(newer.iter())
    }

    /// Most recently pushed element.
    #[must_use]
    pub fn latest(&self) -> Option<&T> {
        if self.len == 0 {
            return None;
        }
        let idx = (self.head + self.slots.len() - 1) % self.slots.len();
        Some(&self.slots[idx])
    }

    /// Oldest live element.
    #[must_use]
    pub fn oldest(&self) -> Option<&T> {
        self.iter().next()
    }

    /// Copy out in chronological order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let (older, newer) = self.as_slices();
        let mut out = Vec::with_capacity(self.len);
        out.extend_from_slice(older);
        out.extend_from_slice(newer);
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_empty() {
        let buf: RingBuffer<u32> = RingBuffer::with_capacity(4);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.phase(), BufferPhase::Filling);
        assert!(buf.latest().is_none());
        assert!(buf.to_vec().is_empty());
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_capacity_panics() {
        let _ = RingBuffer::<u32>::with_capacity(0);
    }

    #[test]
    fn test_filling_is_prefix() {
        let mut buf = RingBuffer::with_capacity(5);
        for v in 1..=3 {
            buf.push(v);
        }
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
        assert_eq!(buf.phase(), BufferPhase::Filling);
        assert_eq!(buf.latest(), Some(&3));
        assert_eq!(buf.oldest(), Some(&1));
    }

    #[test]
    fn test_exactly_full() {
        let mut buf = RingBuffer::with_capacity(3);
        for v in 1..=3 {
            buf.push(v);
        }
        assert!(buf.is_full());
        assert_eq!(buf.phase(), BufferPhase::Wrapped);
        assert_eq!(buf.to_vec(), vec![1, 2, 3]);
        assert_eq!(buf.latest(), Some(&3));
    }

    #[test]
    fn test_wraparound_rotates() {
        let mut buf = RingBuffer::with_capacity(5);
        for v in 1..=7 {
            buf.push(v);
        }
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.to_vec(), vec![3, 4, 5, 6, 7]);
        assert_eq!(buf.oldest(), Some(&3));
        assert_eq!(buf.latest(), Some(&7));
        let (older, newer) = buf.as_slices();
        assert_eq!(older, &[3, 4, 5]);
        assert_eq!(newer, &[6, 7]);
    }

    #[test]
    fn test_reverse_iteration() {
        let mut buf = RingBuffer::with_capacity(3);
        for v in 1..=5 {
            buf.push(v);
        }
        let rev: Vec<_> = buf.iter().rev().copied().collect();
        assert_eq!(rev, vec![5, 4, 3]);
    }

    #[test]
    fn test_clear_hides_stale_slots() {
        let mut buf = RingBuffer::with_capacity(3);
        for v in 1..=5 {
            buf.push(v);
        }
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.phase(), BufferPhase::Filling);
        buf.push(42);
        assert_eq!(buf.to_vec(), vec![42]);
    }

    #[test]
    fn test_read_does_not_mutate() {
        let mut buf = RingBuffer::with_capacity(4);
        for v in 0..10 {
            buf.push(v);
        }
        let first = buf.to_vec();
        let second = buf.to_vec();
        assert_eq!(first, second);
        assert_eq!(buf.len(), 4);
    }
}
