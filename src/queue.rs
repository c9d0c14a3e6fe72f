//! Pending-event queue.
//!
//! A `BinaryHeap` with reversed `Ord` on `Event` acts as a min-heap keyed
//! by `(time, id)`. Cancellation is a tombstone: the id leaves the live
//! map in O(1) and the heap entry is reclaimed whenever it reaches the top.

use std::collections::{BinaryHeap, HashMap};

use crate::error::{KernelError, KernelResult};
use crate::event::{Event, EventId};
use crate::time::VirtualTime;

#[derive(Debug, Default)]
pub struct EventQueue {
    /// Min-heap (via reversed Ord on Event). May hold tombstoned entries.
    heap: BinaryHeap<Event>,
    /// Live events and their fire times.
    live: HashMap<EventId, VirtualTime>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        EventQueue {
            heap: BinaryHeap::new(),
            live: HashMap::new(),
        }
    }

    /// Insert an event. Fails if it would fire before `now`.
    pub fn insert(&mut self, event: Event, now: VirtualTime) -> KernelResult<()> {
        if event.time < now {
            return Err(KernelError::InvalidTime {
                requested: event.time,
                now,
            });
        }
        self.live.insert(event.id, event.time);
        self.heap.push(event);
        Ok(())
    }

    /// Remove and return the event with the smallest `(time, id)`.
    ///
    /// Tombstoned events are returned too, with `valid == false`; the
    /// caller discards them without firing.
    pub fn pop_min(&mut self) -> KernelResult<Event> {
        let mut event = self.heap.pop().ok_or(KernelError::EmptyQueue)?;
        event.valid = self.live.remove(&event.id).is_some();
        Ok(event)
    }

    /// Tombstone a pending event. Returns `false` if it is not pending.
    pub fn remove(&mut self, id: EventId) -> bool {
        self.live.remove(&id).is_some()
    }

    /// Whether `id` is still waiting to fire.
    pub fn contains(&self, id: EventId) -> bool {
        self.live.contains_key(&id)
    }

    /// Fire time of a pending event.
    pub fn time_of(&self, id: EventId) -> Option<VirtualTime> {
        self.live.get(&id).copied()
    }

    /// Key of the heap top, live or not: `(time, is_live)`.
    pub fn peek_key(&self) -> Option<(VirtualTime, bool)> {
        self.heap
            .peek()
            .map(|top| (top.time, self.live.contains_key(&top.id)))
    }

    /// Time of the earliest live event.
    ///
    /// Reclaims tombstones sitting at the top of the heap on the way.
    pub fn next_time(&mut self) -> Option<VirtualTime> {
        while let Some(top) = self.heap.peek() {
            if self.live.contains_key(&top.id) {
                return Some(top.time);
            }
            self.heap.pop();
        }
        None
    }

    /// Number of live (not cancelled) events.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no live events remain.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Drop every entry without firing it. Returns how many were live.
    pub fn clear(&mut self) -> usize {
        let live = self.live.len();
        self.heap.clear();
        self.live.clear();
        live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{boxed, EventIdGen};
    use crate::simulation::SimulationContext;

    struct Harness {
        queue: EventQueue,
        ids: EventIdGen,
    }

    impl Harness {
        fn new() -> Self {
            Harness {
                queue: EventQueue::new(),
                ids: EventIdGen::new(),
            }
        }

        fn push(&mut self, time: u64) -> EventId {
            let id = self.ids.next_id();
            let event = Event::new(
                id,
                VirtualTime::from_nanos(time),
                None,
                boxed(|_ctx: &mut SimulationContext<'_>| {}),
            );
            self.queue.insert(event, VirtualTime::ZERO).unwrap();
            id
        }

        fn drain_keys(&mut self) -> Vec<(u64, u64, bool)> {
            let mut out = Vec::new();
            while let Ok(e) = self.queue.pop_min() {
                out.push((e.time.as_nanos(), e.id.raw(), e.valid));
            }
            out
        }
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut h = Harness::new();
        let a = h.push(10);
        let b = h.push(10);
        let c = h.push(10);

        let order: Vec<u64> = h.drain_keys().into_iter().map(|(_, id, _)| id).collect();
        assert_eq!(order, vec![a.raw(), b.raw(), c.raw()]);
    }

    #[test]
    fn test_time_ordering() {
        let mut h = Harness::new();
        h.push(30);
        h.push(10);
        h.push(20);

        let times: Vec<u64> = h.drain_keys().into_iter().map(|(t, _, _)| t).collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn test_mixed_ordering() {
        let mut h = Harness::new();
        for t in [50, 10, 10, 30, 10, 50, 0] {
            h.push(t);
        }
        let keys = h.drain_keys();
        for w in keys.windows(2) {
            assert!((w[0].0, w[0].1) < (w[1].0, w[1].1), "out of order: {:?}", keys);
        }
    }

    #[test]
    fn test_insert_in_past_rejected() {
        let mut q = EventQueue::new();
        let event = Event::new(
            EventId::new(0),
            VirtualTime::from_nanos(4),
            None,
            boxed(|_ctx: &mut SimulationContext<'_>| {}),
        );
        let err = q.insert(event, VirtualTime::from_nanos(5)).unwrap_err();
        assert!(matches!(err, KernelError::InvalidTime { .. }));
        assert!(q.is_empty());
    }

    #[test]
    fn test_pop_empty() {
        let mut q = EventQueue::new();
        assert!(matches!(q.pop_min(), Err(KernelError::EmptyQueue)));
        assert_eq!(q.next_time(), None);
    }

    #[test]
    fn test_remove_leaves_tombstone() {
        let mut h = Harness::new();
        let a = h.push(1);
        let b = h.push(2);

        assert!(h.queue.remove(a));
        assert!(!h.queue.remove(a), "second remove is a no-op");
        assert!(!h.queue.contains(a));
        assert!(h.queue.contains(b));
        assert_eq!(h.queue.len(), 1);

        let popped = h.drain_keys();
        assert_eq!(popped, vec![(1, a.raw(), false), (2, b.raw(), true)]);
    }

    #[test]
    fn test_next_time_skips_tombstones() {
        let mut h = Harness::new();
        let a = h.push(1);
        h.push(7);
        h.queue.remove(a);

        assert_eq!(h.queue.peek_key(), Some((VirtualTime::from_nanos(1), false)));
        assert_eq!(h.queue.next_time(), Some(VirtualTime::from_nanos(7)));
        assert_eq!(h.queue.peek_key(), Some((VirtualTime::from_nanos(7), true)));
        // The tombstone was reclaimed, so the next pop is the live event.
        assert!(h.queue.pop_min().unwrap().valid);
    }

    #[test]
    fn test_time_of_and_clear() {
        let mut h = Harness::new();
        let a = h.push(9);
        h.push(3);
        assert_eq!(h.queue.time_of(a), Some(VirtualTime::from_nanos(9)));
        assert_eq!(h.queue.clear(), 2);
        assert_eq!(h.queue.time_of(a), None);
        assert!(h.queue.pop_min().is_err());
    }
}
