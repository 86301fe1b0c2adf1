//! Circular buffer and control flags.
//!
//! The buffer keeps one slot empty to tell full from empty:
//!
//! - empty ⇔ `IN == OUT`
//! - full  ⇔ `(IN + 1) % slots == OUT`
//!
//! so a buffer of `n` slots holds at most `n - 1` entries, and a one-slot
//! buffer always reports full.
//!
//! Slots are packed into `AtomicU64` cells (`item << 32 | producer`). A
//! zero cell is an empty slot; since real items are ≥ 1 no entry packs to
//! zero. Cursor updates publish slot writes with release/acquire ordering.
//!
//! [`BoundedBuffer::put`] and [`BoundedBuffer::take`] do not check fullness
//! or emptiness themselves: the caller must hold the matching region lock
//! from [`crate::LockSet`] and must have observed the buffer not full / not
//! empty inside that region.

use crate::error::BufferError;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// One buffered item together with the id of the producer that inserted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub item: u32,
    pub producer: u32,
}

impl Entry {
    /// Substituted for absent or malformed slots. Item 0 never collides with
    /// real items.
    pub const INVALID: Entry = Entry {
        item: 0,
        producer: 0,
    };

    pub const fn new(item: u32, producer: u32) -> Self {
        Self { item, producer }
    }

    #[inline]
    const fn pack(self) -> u64 {
        ((self.item as u64) << 32) | self.producer as u64
    }

    #[inline]
    const fn unpack(cell: u64) -> Self {
        Self {
            item: (cell >> 32) as u32,
            producer: cell as u32,
        }
    }
}

/// Run-scoped control flags.
///
/// Single writer per flag: `KILL` by the watchdog or interrupt path (sticky
/// once set), `PRODUCERS_DONE` and `CONSUMERS_DONE` by the orchestrator.
#[derive(Debug, Default)]
pub struct ControlFlags {
    kill: AtomicBool,
    producers_done: AtomicBool,
    consumers_done: AtomicBool,
}

impl ControlFlags {
    /// Set `KILL`. Returns `true` only for the call that flipped it.
    pub fn request_kill(&self) -> bool {
        !self.kill.swap(true, Ordering::SeqCst)
    }

    #[inline]
    pub fn is_killed(&self) -> bool {
        self.kill.load(Ordering::SeqCst)
    }

    pub fn set_producers_done(&self) {
        self.producers_done.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn producers_done(&self) -> bool {
        self.producers_done.load(Ordering::SeqCst)
    }

    pub fn set_consumers_done(&self) {
        self.consumers_done.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn consumers_done(&self) -> bool {
        self.consumers_done.load(Ordering::SeqCst)
    }

    /// Whether any worker class may still be running.
    pub fn workers_active(&self) -> bool {
        !self.producers_done() || !self.consumers_done()
    }
}

/// Fixed-size circular buffer with `IN`/`OUT` cursors.
#[derive(Debug)]
pub struct BoundedBuffer {
    slots: Box<[AtomicU64]>,
    cursor_in: AtomicUsize,
    cursor_out: AtomicUsize,
    flags: ControlFlags,
}

impl BoundedBuffer {
    /// Create a buffer with exactly `slots` slots, all empty, cursors at 0.
    ///
    /// # Errors
    /// Returns `BufferError::ZeroSlots` when `slots == 0`.
    pub fn new(slots: usize) -> Result<Self, BufferError> {
        if slots == 0 {
            return Err(BufferError::ZeroSlots);
        }
        Ok(Self {
            slots: (0..slots).map(|_| AtomicU64::new(0)).collect(),
            cursor_in: AtomicUsize::new(0),
            cursor_out: AtomicUsize::new(0),
            flags: ControlFlags::default(),
        })
    }

    /// Number of slots (one more than the usable capacity).
    #[inline]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn flags(&self) -> &ControlFlags {
        &self.flags
    }

    /// Current `(IN, OUT)` pair.
    pub fn cursors(&self) -> (usize, usize) {
        (
            self.cursor_in.load(Ordering::Acquire),
            self.cursor_out.load(Ordering::Acquire),
        )
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        let (cursor_in, cursor_out) = self.cursors();
        cursor_in == cursor_out
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        let (cursor_in, cursor_out) = self.cursors();
        (cursor_in + 1) % self.num_slots() == cursor_out
    }

    /// Number of entries currently buffered.
    pub fn len(&self) -> usize {
        let (cursor_in, cursor_out) = self.cursors();
        (cursor_in + self.num_slots() - cursor_out) % self.num_slots()
    }

    /// Store `entry` at `IN` and advance `IN`.
    ///
    /// Caller holds the insert region and has seen the buffer not full.
    pub fn put(&self, entry: Entry) {
        let cursor_in = self.cursor_in.load(Ordering::Acquire);
        self.slots[cursor_in].store(entry.pack(), Ordering::Release);
        self.cursor_in
            .store((cursor_in + 1) % self.num_slots(), Ordering::Release);
    }

    /// Remove the entry at `OUT` and advance `OUT`.
    ///
    /// Caller holds the remove region and has seen the buffer not empty.
    /// An empty slot yields [`Entry::INVALID`].
    pub fn take(&self) -> Entry {
        let cursor_out = self.cursor_out.load(Ordering::Acquire);
        let cell = self.slots[cursor_out].swap(0, Ordering::AcqRel);
        self.cursor_out
            .store((cursor_out + 1) % self.num_slots(), Ordering::Release);
        if cell == 0 {
            Entry::INVALID
        } else {
            Entry::unpack(cell)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_slots_rejected() {
        assert_eq!(BoundedBuffer::new(0).unwrap_err(), BufferError::ZeroSlots);
    }

    #[test]
    fn new_buffer_is_empty() {
        let buffer = BoundedBuffer::new(4).unwrap();
        assert!(buffer.is_empty());
        assert!(!buffer.is_full());
        assert_eq!(buffer.cursors(), (0, 0));
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn one_slot_is_always_full() {
        let buffer = BoundedBuffer::new(1).unwrap();
        assert!(buffer.is_full());
        assert!(buffer.is_empty());
    }

    #[test]
    fn holds_slots_minus_one() {
        let buffer = BoundedBuffer::new(3).unwrap();
        buffer.put(Entry::new(1, 1));
        assert!(!buffer.is_full());
        buffer.put(Entry::new(2, 1));
        assert!(buffer.is_full());
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn cursors_wrap() {
        let buffer = BoundedBuffer::new(2).unwrap();
        for item in 1..=5 {
            buffer.put(Entry::new(item, 7));
            assert!(buffer.is_full());
            assert_eq!(buffer.take(), Entry::new(item, 7));
            assert!(buffer.is_empty());
            let (cursor_in, cursor_out) = buffer.cursors();
            assert!(cursor_in < 2 && cursor_out < 2);
        }
    }

    #[test]
    fn fifo_order() {
        let buffer = BoundedBuffer::new(5).unwrap();
        for item in 1..=4 {
            buffer.put(Entry::new(item, item % 2 + 1));
        }
        let taken: Vec<u32> = (0..4).map(|_| buffer.take().item).collect();
        assert_eq!(taken, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_slot_takes_as_invalid() {
        let buffer = BoundedBuffer::new(3).unwrap();
        assert_eq!(buffer.take(), Entry::INVALID);
    }

    #[test]
    fn pack_round_trip_extremes() {
        let entry = Entry::new(u32::MAX, u32::MAX);
        assert_eq!(Entry::unpack(entry.pack()), entry);
        assert_ne!(Entry::new(1, 0).pack(), 0);
    }

    #[test]
    fn kill_is_sticky_and_reported_once() {
        let flags = ControlFlags::default();
        assert!(!flags.is_killed());
        assert!(flags.request_kill());
        assert!(!flags.request_kill());
        assert!(flags.is_killed());
    }

    #[test]
    fn workers_active_until_both_done() {
        let flags = ControlFlags::default();
        assert!(flags.workers_active());
        flags.set_producers_done();
        assert!(flags.workers_active());
        flags.set_consumers_done();
        assert!(!flags.workers_active());
    }
}
