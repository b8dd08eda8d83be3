//! Indexed binary min-heap ordering timers by fire time.
//!
//! Each slot holds a timer id and its [`TimerKey`]. An id → slot index
//! makes `remove` and `update` O(log n), which the scheduler needs for
//! `stop`, `pause` and re-arming a timer in place.

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;

use crate::identifiers::TimerId;

// ============================================================================
// Constants
// ============================================================================

/// Two expire times closer than this are treated as equal.
pub(crate) const EXPIRE_EPSILON: f64 = 1e-5;

// ============================================================================
// TimerKey
// ============================================================================

/// Sort key of a queued timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimerKey {
    /// Absolute scheduler-clock fire time, in seconds.
    pub expire_at: f64,
    /// Registration order, breaks ties between equal expire times.
    pub order: u32,
}

impl TimerKey {
    /// Returns `true` if a timer with this key fires before `other`.
    ///
    /// Expire times within [`EXPIRE_EPSILON`] compare by insertion order.
    #[inline]
    #[must_use]
    pub fn fires_before(&self, other: &Self) -> bool {
        if (self.expire_at - other.expire_at).abs() <= EXPIRE_EPSILON {
            return self.order < other.order;
        }
        self.expire_at < other.expire_at
    }
}

// ============================================================================
// TimerQueue
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Slot {
    id: TimerId,
    key: TimerKey,
}

/// Min-priority queue of timer ids keyed by `(expire_at, order)`.
#[derive(Debug, Default)]
pub(crate) struct TimerQueue {
    slots: Vec<Slot>,
    index: FxHashMap<TimerId, usize>,
}

impl TimerQueue {
    /// Creates an empty queue with room for `capacity` timers.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let mut index = FxHashMap::default();
        index.reserve(capacity);
        Self {
            slots: Vec::with_capacity(capacity),
            index,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns the next timer to fire without removing it.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> Option<(TimerId, TimerKey)> {
        self.slots.first().map(|slot| (slot.id, slot.key))
    }

    /// Inserts a timer, or re-keys it if already queued.
    pub fn push(&mut self, id: TimerId, key: TimerKey) {
        if self.update(id, key) {
            return;
        }
        let pos = self.slots.len();
        self.slots.push(Slot { id, key });
        self.index.insert(id, pos);
        self.sift_up(pos);
    }

    /// Removes and returns the next timer to fire.
    pub fn pop(&mut self) -> Option<(TimerId, TimerKey)> {
        self.remove_at(0)
    }

    /// Removes a timer, returning its key if it was queued.
    pub fn remove(&mut self, id: TimerId) -> Option<TimerKey> {
        let pos = *self.index.get(&id)?;
        self.remove_at(pos).map(|(_, key)| key)
    }

    /// Re-keys a queued timer. Returns `false` if it is not queued.
    pub fn update(&mut self, id: TimerId, key: TimerKey) -> bool {
        let Some(&pos) = self.index.get(&id) else {
            return false;
        };
        self.slots[pos].key = key;
        let pos = self.sift_up(pos);
        self.sift_down(pos);
        true
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
    }

    fn remove_at(&mut self, pos: usize) -> Option<(TimerId, TimerKey)> {
        if pos >= self.slots.len() {
            return None;
        }
        let last = self.slots.len() - 1;
        self.swap(pos, last);
        let slot = self.slots.pop()?;
        self.index.remove(&slot.id);

        if pos < self.slots.len() {
            let pos = self.sift_up(pos);
            self.sift_down(pos);
        }
        Some((slot.id, slot.key))
    }

    fn swap(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        self.slots.swap(a, b);
        self.index.insert(self.slots[a].id, a);
        self.index.insert(self.slots[b].id, b);
    }

    fn sift_up(&mut self, mut pos: usize) -> usize {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if !self.slots[pos].key.fires_before(&self.slots[parent].key) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
        pos
    }

    fn sift_down(&mut self, mut pos: usize) -> usize {
        let len = self.slots.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut first = pos;

            if left < len && self.slots[left].key.fires_before(&self.slots[first].key) {
                first = left;
            }
            if right < len && self.slots[right].key.fires_before(&self.slots[first].key) {
                first = right;
            }
            if first == pos {
                return pos;
            }
            self.swap(pos, first);
            pos = first;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(expire_at: f64, order: u32) -> TimerKey {
        TimerKey { expire_at, order }
    }

    fn drain(queue: &mut TimerQueue) -> Vec<TimerId> {
        std::iter::from_fn(|| queue.pop().map(|(id, _)| id)).collect()
    }

    #[test]
    fn test_pops_in_expire_order() {
        let ids: Vec<TimerId> = (0..5).map(|_| TimerId::next()).collect();
        let mut queue = TimerQueue::with_capacity(8);
        queue.push(ids[0], key(3.0, 1));
        queue.push(ids[1], key(1.0, 2));
        queue.push(ids[2], key(5.0, 3));
        queue.push(ids[3], key(2.0, 4));
        queue.push(ids[4], key(4.0, 5));

        assert_eq!(drain(&mut queue), vec![ids[1], ids[3], ids[0], ids[4], ids[2]]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_ties_break_by_order() {
        let a = TimerId::next();
        let b = TimerId::next();
        let mut queue = TimerQueue::default();
        queue.push(b, key(1.0, 2));
        queue.push(a, key(1.0, 1));

        assert_eq!(drain(&mut queue), vec![a, b]);
    }

    #[test]
    fn test_epsilon_jitter_falls_back_to_order() {
        let a = TimerId::next();
        let b = TimerId::next();
        let mut queue = TimerQueue::default();
        // b expires marginally earlier but was registered later
        queue.push(a, key(1.000_001, 1));
        queue.push(b, key(1.0, 2));

        assert_eq!(drain(&mut queue), vec![a, b]);
    }

    #[test]
    fn test_remove_from_middle() {
        let ids: Vec<TimerId> = (0..4).map(|_| TimerId::next()).collect();
        let mut queue = TimerQueue::default();
        for (i, id) in ids.iter().enumerate() {
            queue.push(*id, key(i as f64, i as u32));
        }

        assert_eq!(queue.remove(ids[1]), Some(key(1.0, 1)));
        assert_eq!(queue.remove(ids[1]), None);
        assert_eq!(drain(&mut queue), vec![ids[0], ids[2], ids[3]]);
    }

    #[test]
    fn test_update_moves_timer() {
        let a = TimerId::next();
        let b = TimerId::next();
        let mut queue = TimerQueue::default();
        queue.push(a, key(1.0, 1));
        queue.push(b, key(2.0, 2));

        assert!(queue.update(a, key(3.0, 1)));
        assert_eq!(queue.peek().map(|(id, _)| id), Some(b));

        // pushing a queued id re-keys it instead of duplicating
        queue.push(a, key(0.5, 1));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.peek().map(|(id, _)| id), Some(a));
    }

    #[test]
    fn test_update_unknown_returns_false() {
        let mut queue = TimerQueue::default();
        assert!(!queue.update(TimerId::next(), key(1.0, 1)));
    }
}
