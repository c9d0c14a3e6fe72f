//! Events: a callback bound to a virtual-time deadline.
//!
//! Every effect in a simulation is an `Event` on the queue. Events are
//! ordered by `(time, id)`; because ids are minted in scheduling order,
//! the id doubles as the insertion sequence that breaks ties.

use std::cmp::Ordering;
use std::fmt;

use crate::context::ContextId;
use crate::error::BoxError;
use crate::simulation::SimulationContext;
use crate::time::VirtualTime;

// ── Event ID ──────────────────────────────────────────────────────────

/// A unique, strictly-increasing event handle.
///
/// Returned by every `schedule*` call and accepted by `cancel`,
/// `is_pending` and `delay_left`. Stale handles (already fired or
/// cancelled) are harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct EventId(u64);

impl EventId {
    #[inline]
    pub fn new(raw: u64) -> Self {
        EventId(raw)
    }

    #[inline]
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E#{}", self.0)
    }
}

// ── Event ID Generator ───────────────────────────────────────────────

/// Monotonic event-id generator. Each `Simulation` owns exactly one.
#[derive(Debug, Clone, Default)]
pub struct EventIdGen {
    next: u64,
}

impl EventIdGen {
    pub fn new() -> Self {
        EventIdGen { next: 0 }
    }

    /// Create a generator starting at a specific value.
    pub fn starting_at(start: u64) -> Self {
        EventIdGen { next: start }
    }

    /// Mint the next event ID.
    pub fn next_id(&mut self) -> EventId {
        let id = EventId(self.next);
        self.next += 1;
        id
    }

    /// Peek at the next ID without consuming it.
    pub fn peek(&self) -> EventId {
        EventId(self.next)
    }
}

// ── Callbacks ─────────────────────────────────────────────────────────

/// Return types a callback may produce.
///
/// A callback returning `()` cannot fail. A callback returning
/// `Result<(), E>` aborts the run loop when it yields `Err`.
pub trait CallbackOutcome {
    fn into_result(self) -> Result<(), BoxError>;
}

impl CallbackOutcome for () {
    #[inline]
    fn into_result(self) -> Result<(), BoxError> {
        Ok(())
    }
}

impl<E> CallbackOutcome for Result<(), E>
where
    E: Into<BoxError>,
{
    #[inline]
    fn into_result(self) -> Result<(), BoxError> {
        self.map_err(Into::into)
    }
}

pub(crate) type Callback = Box<dyn FnOnce(&mut SimulationContext<'_>) -> Result<(), BoxError>>;

/// Erase a user callback into the boxed form stored on the queue.
pub(crate) fn boxed<F, R>(f: F) -> Callback
where
    F: FnOnce(&mut SimulationContext<'_>) -> R + 'static,
    R: CallbackOutcome,
{
    Box::new(move |ctx: &mut SimulationContext<'_>| f(ctx).into_result())
}

// ── Event ─────────────────────────────────────────────────────────────

/// A single scheduled callback.
pub struct Event {
    pub id: EventId,
    pub time: VirtualTime,
    pub context: Option<ContextId>,
    /// Cleared when the event is cancelled. Only meaningful on an event
    /// returned by `EventQueue::pop_min`.
    pub valid: bool,
    pub(crate) callback: Callback,
}

impl Event {
    pub(crate) fn new(
        id: EventId,
        time: VirtualTime,
        context: Option<ContextId>,
        callback: Callback,
    ) -> Self {
        Event {
            id,
            time,
            context,
            valid: true,
            callback,
        }
    }

    /// The ordering key: smaller fires first.
    #[inline]
    pub fn key(&self) -> (VirtualTime, EventId) {
        (self.time, self.id)
    }

    /// Consume the event and run its callback.
    pub(crate) fn fire(self, ctx: &mut SimulationContext<'_>) -> Result<(), BoxError> {
        (self.callback)(ctx)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("context", &self.context)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Event {}

/// Ordering: smallest `(time, id)` first.
///
/// `BinaryHeap` is a max-heap, so the natural ordering is reversed here
/// to make it pop the earliest event.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
